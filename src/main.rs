use clap::Parser;
use cookie_fixture::{serve, CookieResponder};
use fixture_runtime::{FixtureConfig, Request, ResponseControl};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cookie-fixture")]
#[command(version = "0.1.0")]
#[command(about = "Cookie test fixture server: sets or drops cookies from query parameters", long_about = None)]
struct Cli {
    /// Query string to answer once, e.g. `set=%22a%3D1%22`
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    #[arg(short = 'S', long = "server", value_name = "ADDR:PORT")]
    server: Option<String>,

    #[arg(short = 't', long = "docroot", value_name = "DIR")]
    docroot: Option<PathBuf>,

    /// Directory holding fixture.toml or fixture.json
    #[arg(short = 'c', long = "config", value_name = "DIR", default_value = ".")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match FixtureConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    init_tracing(&config);

    if let Some(docroot) = cli.docroot {
        config.server.docroot = docroot;
    }
    config.server.docroot = config
        .server
        .docroot
        .canonicalize()
        .unwrap_or_else(|_| config.server.docroot.clone());

    if let Some(addr) = cli.server {
        run_server(config, &addr)
    } else if let Some(query) = cli.query {
        run_query(&config, &query)
    } else {
        print_usage();
        ExitCode::SUCCESS
    }
}

fn init_tracing(config: &FixtureConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = config.log.filter.as_deref().unwrap_or("cookie_fixture=info");
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("cookie_fixture=info"))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_server(config: FixtureConfig, addr: &str) -> ExitCode {
    let addr: SocketAddr = match addr.parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(_) => match config.server.addr.parse::<SocketAddr>() {
            Ok(fallback) => {
                warn!(requested = addr, %fallback, "invalid address format, using configured address");
                fallback
            }
            Err(_) => {
                eprintln!("Invalid address format: {}", addr);
                return ExitCode::from(1);
            }
        },
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(serve(config, addr)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run_query(config: &FixtureConfig, query: &str) -> ExitCode {
    let responder = CookieResponder::new(config.cors.clone());
    let res = responder.respond(&Request::from_query(query.trim_start_matches('?')));
    print_response(&res);

    if res.status_code < 400 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_response(res: &ResponseControl) {
    println!("Status: {}", res.status_code);
    for (name, value) in &res.headers {
        println!("{}: {}", name, String::from_utf8_lossy(value));
    }
    println!();
    println!("{}", String::from_utf8_lossy(&res.body));
}

fn print_usage() {
    println!(r#"cookie-fixture - Cookie test fixture server

Usage:
  cookie-fixture <QUERY>                    Answer one query and print the response
  cookie-fixture -S <addr:port> [options]   Start the fixture server

Options:
  -S, --server <ADDR:PORT>        Start the HTTP server
  -t, --docroot <DIR>             Static document root (default: .)
  -c, --config <DIR>              Directory with fixture.toml / fixture.json

Routes:
  /cookies/resources/cookie.py    ?set=, ?drop=, ?location=
  /cookies/resources/list.py      JSON object of the cookies sent

Parameters:
  set=<json>                      String or array of Set-Cookie values
  drop=<json>                     Same, each sent with "; max-age=0"
  location=<url>                  Redirect (302) after setting cookies

Examples:
  cookie-fixture 'set=%22a%3D1%22'
  cookie-fixture -S 0.0.0.0:8000 -t ./www
"#);
}
