//! # sitecore-layout - Typed Sitecore Layout Service Content
//!
//! Turns layout service JSON into a typed content tree and, in editing mode,
//! wraps that tree in the `<code type="text/sitecore">` chrome markers the
//! authoring client needs. It provides:
//!
//! - **Layout deserialization**: routes, placeholders, components and devices
//!   that tolerate malformed sections
//! - **Deferred fields**: raw field JSON decoded on demand into any shape
//! - **Chrome injection**: open/close markers around placeholders, renderings
//!   and editable fields
//! - **Editing flow**: GraphQL editing query, decoration and dictionary merge
//!
//! ## Quick Start
//!
//! ```
//! use sitecore_layout::{ChromeFeed, LayoutDeserializer, inject_chromes};
//! use sitecore_layout::field::TextField;
//!
//! let json = r#"{
//!     "sitecore": {
//!         "context": {"pageEditing": true, "language": "en"},
//!         "route": {
//!             "name": "home",
//!             "fields": {"pageTitle": {"value": "Welcome"}},
//!             "placeholders": {"main": [{"uid": "hero", "componentName": "Hero"}]}
//!         }
//!     }
//! }"#;
//!
//! let response = LayoutDeserializer::default().deserialize(json)?;
//! let title: TextField = response.route().unwrap().field("pageTitle").unwrap().decode()?;
//! assert_eq!(title.value, "Welcome");
//!
//! let decorated = inject_chromes(response, &ChromeFeed::everything());
//! let main = decorated.route().unwrap().placeholder("main").unwrap();
//! assert_eq!(main.len(), 5);
//! assert_eq!(main.chromes().next().unwrap().id(), Some("main_hero"));
//!
//! # Ok::<(), sitecore_layout::LayoutError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`layout`] | Content tree types and the layout deserializer |
//! | [`field`] | Field readers and built-in field shapes |
//! | [`chrome`] | Chrome feeds and chrome injection |
//! | [`editing`] | Editing flow and the editing service client |
//! | [`server`] | Preview HTTP server |
//! | [`config`] | Editing and server configuration |
//! | [`error`] | Error types |

pub mod chrome;
pub mod config;
pub mod editing;
pub mod error;
pub mod field;
pub mod layout;
pub mod server;

// Re-exports for convenience
pub use chrome::{ChromeFeed, ChromeMarker, inject_chromes};
pub use editing::{EditingRequest, EditingResponse, EditingService};
pub use error::{FieldDecodeError, LayoutError};
pub use field::FieldReader;
pub use layout::{LayoutDeserializer, LayoutResponse};
