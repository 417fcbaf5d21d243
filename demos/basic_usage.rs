//! Basic usage example for kcfg
//!
//! Reads a small document, shows typed access, sub-configurations, merging
//! and the serde view. Run with `RUST_LOG=kcfg=trace` to see the reader's
//! log events.

use kcfg::{AmbientDefinitions, ConfigError, ConfigReader};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct ServerConfig {
    host: String,
    port: u16,
    debug: bool,
    aliases: Vec<String>,
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kcfg=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let text = r#"
        def domain = "example.com"

        server {
            host    = "www.${domain}"
            port    = "8080"
            debug   = "off"
            aliases = [ "api.${domain}", "static.${domain}" ]
        }

        database {
            url  = "postgres://db.${domain}/app"
            user = "${env.USER}"
        }
    "#;

    let ambient = AmbientDefinitions::capture().with_env("USER", "demo");
    let config = ConfigReader::new(text).with_ambient(ambient).read()?;

    println!("Flat store ({} entries):", config.len());
    print!("{config}");

    println!("\nserver.port as integer: {}", config.get_i32("server.port")?);
    println!("server.debug as bool:   {}", config.get_bool("server.debug")?);

    let server: ServerConfig = config.sub_config(["server"]).deserialize_into()?;
    println!(
        "\nTyped server section: {}:{} (debug: {}, aliases: {})",
        server.host,
        server.port,
        server.debug,
        server.aliases.join(", ")
    );

    let overrides = ConfigReader::new(r#"server { port = "9090" debug = "on" }"#)
        .with_ambient(AmbientDefinitions::new())
        .read()?;
    let merged = config.merge(&overrides);
    println!(
        "\nAfter merge: port = {}, debug = {}",
        merged.get("server.port")?,
        merged.get_bool("server.debug")?
    );

    match ConfigReader::new("server { port = 8080 }").read() {
        Ok(_) => println!("\nUnexpectedly accepted an unquoted value"),
        Err(err) => println!("\nRejected malformed input: {err}"),
    }

    Ok(())
}
