//! # confscope-engine
//!
//! Turns one master document and a manifest into one transformed document per
//! scope combination.
//!
//! A manifest declares query aliases, a tree of scope dimensions and values
//! (say `environment` × `region`) and edit commands at any level of that
//! tree. Every leaf of the tree gets its own copy of the master document, to
//! which the commands along its ancestor chain are applied root first.
//!
//! ```xml
//! <manifest outputFormat="web.{environment}.config">
//!   <path>
//!     <add name="setting" path="/configuration/appSettings/add[@key='{parameter}']/@value"/>
//!   </path>
//!   <sections name="environment">
//!     <section name="dev"/>
//!     <section name="prod">
//!       <transform>
//!         <update path="#setting" param="mode" value="release"/>
//!       </transform>
//!     </section>
//!   </sections>
//! </manifest>
//! ```

pub mod command;
pub mod error;
pub mod query_alias;
pub mod scope;
pub mod transformer;
pub mod vocabulary;

pub use command::{CommandValue, EditCommand, EditKind, Target};
pub use error::{ApplyError, ConfigurationError, SinkError, TransformError};
pub use query_alias::{
    PathTemplate, QueryAliasTable, DEFAULT_ALIAS_INDICATOR, DEFAULT_PARAMETER_PLACEHOLDER,
};
pub use scope::{describe_scope, ScopeCommandSet, ScopeKind, ScopeMap};
pub use transformer::{render_output_name, ScopedDocument, Transformer};
pub use vocabulary::ManifestVocabulary;
