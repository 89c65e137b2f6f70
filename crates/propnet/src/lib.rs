//! propnet: bidirectional constraint propagation.
//!
//! Connectors hold at most one value; constraints relate connectors and push
//! derived values between them. Setting a value is solving: the network
//! cascades every inference a single `set_value` call makes possible.
//!
//! ```
//! use propnet::Network;
//!
//! let mut net: Network<i64> = Network::new();
//! let a = net.add_named_connector("a");
//! let b = net.add_named_connector("b");
//! let c = net.add_named_connector("c");
//! net.add_adder(a, b, c).unwrap();
//!
//! net.set_value(a, 1).unwrap();
//! net.set_value(b, 2).unwrap();
//! assert_eq!(net.get_value(c), Ok(3));
//!
//! net.drop_value(c).unwrap();
//! net.drop_value(a).unwrap();
//! net.set_value(c, 10).unwrap();
//! assert_eq!(net.get_value(a), Ok(8));
//! ```

pub mod arena;
pub mod connector;
pub mod constraint;
pub mod error;
pub mod ledger;
pub mod network;
pub mod relations;
pub mod snapshot;
pub mod value;

pub use connector::{Connector, ConnectorId};
pub use constraint::{Conflict, Constraint, ConstraintId, Effect, Reaction, ReactionResult, Role, RoleValues};
pub use error::{Contradiction, NetworkError};
pub use ledger::ChangeRecord;
pub use network::{ContradictionPolicy, Network, NetworkConfig, PropagationStats};
pub use snapshot::NetworkSnapshot;
pub use value::{CellValue, Numeric};
