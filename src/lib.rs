//! apidsl — parse and validate `.api` service definitions.
//!
//! A `.api` file declares request/response struct types, an `info` metadata
//! block, and a `service` of annotated routes. Parsing produces an
//! [`ApiSpec`] that code generators consume through [`query`]; nothing is
//! returned unless the whole specification validates.
//!
//! ```
//! let spec = apidsl::parse_str(
//!     "type User struct {\n\tName string `json:\"name\"`\n}\nservice Demo {\n\tget /users returns (User)\n}\n",
//! )
//! .unwrap();
//! assert_eq!(spec.service.routes().next().unwrap().response_type, "User");
//! ```

pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod query;
pub mod validate;

pub use error::{Error, Result, Warning};
pub use model::ApiSpec;
pub use parser::{parse_dir, parse_file, parse_str, Dialect};
