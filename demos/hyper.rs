//
//  Sample application.
//
//  Serves a local directory (or an ephemeral in-memory tree) over
//  plain http. Mountable from Linux, macOS and Windows file managers.
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;

use dav_engine::{DavHandler, FileSystem};

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// local directory to serve; omit for the in-memory filesystem
    #[arg(short, long)]
    dir: Option<String>,
    /// URL prefix the tree is mounted under, e.g. /dav
    #[arg(long, default_value = "")]
    prefix: String,
    /// refuse all mutating methods
    #[arg(short, long)]
    read_only: bool,
    /// disable PROPFIND directory listings
    #[arg(long)]
    no_listings: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let (fs, name) = match cli.dir.as_deref() {
        Some(dir) => (FileSystem::local(dir), dir.to_string()),
        None => (FileSystem::Mem, "memory filesystem".to_string()),
    };

    let dav_server = DavHandler::builder(fs)
        .strip_prefix(cli.prefix)
        .read_only(cli.read_only)
        .listings(!cli.no_listings)
        .build();

    let make_service = hyper::service::make_service_fn(move |_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| {
                let dav_server = dav_server.clone();
                async move { Ok::<_, Infallible>(dav_server.handle(req).await) }
            };
            Ok::<_, Infallible>(hyper::service::service_fn(func))
        }
    });

    let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", cli.port))?;
    let server = hyper::Server::try_bind(&addr)?.serve(make_service);

    println!("Serving {} on {}", name, cli.port);
    server.await?;
    Ok(())
}
