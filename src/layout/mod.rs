//! # Layout Content Tree
//!
//! Deserialize layout service responses into a typed tree of routes,
//! placeholders, components and fields.
//!
//! ## Example
//!
//! ```
//! use sitecore_layout::layout::{LayoutDeserializer, SequentialIds};
//! use sitecore_layout::field::TextField;
//!
//! let json = r#"{
//!     "sitecore": {
//!         "context": {"language": "en", "pageEditing": false},
//!         "route": {
//!             "name": "home",
//!             "placeholders": {
//!                 "main": [
//!                     {"componentName": "Hero", "fields": {"Title": {"value": "Hello"}}}
//!                 ]
//!             }
//!         }
//!     }
//! }"#;
//!
//! let response = LayoutDeserializer::new(SequentialIds::new("c"))
//!     .deserialize(json)
//!     .unwrap();
//! let hero = response.route().unwrap().placeholder("main").unwrap()
//!     .components().next().unwrap();
//! assert_eq!(hero.id, "c-1");
//! let title: TextField = hero.field("Title").unwrap().decode().unwrap();
//! assert_eq!(title.value, "Hello");
//! ```

mod deserialize;
mod ids;
mod placeholder;
mod schema;
pub mod types;

pub use deserialize::{LayoutDeserializer, deserialize};
pub use ids::{IdGenerator, NIL_ID, SequentialIds, UuidGenerator};
pub use placeholder::PlaceholderConverter;
pub use types::*;
