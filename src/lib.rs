//! # kcfg
//!
//! A reader for a small, section based configuration language that produces
//! an immutable store of string values addressed by dotted path.
//!
//! ## Overview
//!
//! Documents consist of optional leading `def` statements followed by items
//! and sections. Items hold a single quoted value or a bracketed list of quoted
//! values; sections group items under a common path prefix. Values may refer
//! to definitions with `${name}`, where definitions come from the environment
//! (`env.NAME`), system properties (`system.name`), caller supplied user
//! definitions and the document's own `def` statements.
//!
//! ```text
//! def home = "/opt/app"
//!
//! # comments run to the end of the line
//! server {
//!     host  = "localhost"
//!     ports = [ "8080", "8443" ]
//!     data.dir = '${home}/data'
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Flat store**: every value is reachable by its full dotted path
//! - **Lists**: `[ ... ]` values with `<path>.size` / `<path>.N` export
//! - **Definitions**: single pass `${name}` substitution with strict
//!   rejection of anything left unresolved
//! - **Typed access**: integer, float and boolean getters over string values
//! - **Composition**: sub-configurations by section and overlay merging
//! - **Serde Integration**: read a store into `#[derive(Deserialize)]` types
//! - **Precise errors**: every syntax error carries its line and column
//!
//! ## Basic Usage
//!
//! ```rust
//! use kcfg::ConfigReader;
//!
//! let config = ConfigReader::new(r#"
//!     def home = "/opt/app"
//!     server {
//!         host = "localhost"
//!         ports = [ "8080", "8443" ]
//!         data.dir = '${home}/data'
//!     }
//! "#)
//! .read()?;
//!
//! assert_eq!(config.get("server.host")?, "localhost");
//! assert_eq!(config.get_i32_list("server.ports")?, vec![8080, 8443]);
//! assert_eq!(config.get("server.data.dir")?, "/opt/app/data");
//! # Ok::<(), kcfg::ConfigError>(())
//! ```
//!
//! ## Definitions
//!
//! The environment and system properties are captured once per read unless
//! a snapshot is supplied explicitly, which keeps reading deterministic:
//!
//! ```rust
//! use kcfg::{AmbientDefinitions, ConfigReader};
//!
//! let ambient = AmbientDefinitions::new().with_env("USER", "john");
//! let config = ConfigReader::new(r#"owner = "${env.USER} (${team})""#)
//!     .with_ambient(ambient)
//!     .with_definition("team", "ops")
//!     .read()?;
//!
//! assert_eq!(config.get("owner")?, "john (ops)");
//! # Ok::<(), kcfg::ConfigError>(())
//! ```
//!
//! ## Serde Integration
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Server {
//!     host: String,
//!     port: u16,
//!     debug: bool,
//! }
//!
//! let server: Server = kcfg::from_str(r#"
//!     host = "localhost"
//!     port = "8080"
//!     debug = "off"
//! "#)?;
//!
//! assert_eq!(server.port, 8080);
//! assert!(!server.debug);
//! # Ok::<(), kcfg::ConfigError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use kcfg::{ConfigError, ConfigReader, ParseError};
//!
//! match ConfigReader::new("user = john").read() {
//!     Err(ConfigError::Parse(ParseError::UnexpectedToken { position, .. })) => {
//!         assert_eq!((position.line, position.column), (1, 8));
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```

pub mod builder;
pub mod config;
pub mod definitions;
pub mod deserializer;
pub mod error;
pub mod lexer;
pub mod lookahead;
pub mod parser;


// Re-export main types for convenience
pub use builder::{ConfigValue, Value};
pub use config::Config;
pub use definitions::AmbientDefinitions;
pub use deserializer::{ConfigDeserializer, from_config, from_str};
pub use error::{
    AccessError, ConfigError, DefinitionError, LexError, ParseError, Position, SerdeError,
};
pub use lexer::{ConfigLexer, Token, TokenKind};
pub use parser::{ConfigReader, ReaderConfig, read};
pub use rust_decimal::Decimal;
