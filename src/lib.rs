pub mod ast;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod flags;
pub mod loader;
pub mod scope;
pub mod session;
pub mod value;
pub mod view;

pub use error::QueryError;
pub use flags::Flags;
pub use loader::TableLoader;
pub use session::{CancelToken, Session};
pub use value::{Primary, Ternary};
pub use view::{Cell, Header, Record, RecordSet, View};
