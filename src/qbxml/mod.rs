//! QBXML document handling: XML tree, entity model, request builder,
//! validator and transformer.

pub mod document;
pub mod entity;
pub mod request;
pub mod samples;
pub mod transformer;
pub mod types;
pub mod validator;

pub use document::{DocumentError, RawValue, XmlElement};
pub use entity::{
    Address, Barcode, CreditCardInfo, Customer, Entity, EntityBase, GenericEntity, Invoice, Item,
    LineItem, Reference, SalesOrPurchase,
};
pub use request::{ActiveStatus, MatchCriterion, NameFilter, QbxmlRequest, QueryFilters};
pub use transformer::{ResponseInfo, ResponseTransform, TransformError, Transformer};
pub use types::{EntityType, Operation, ValidationIssue, ValidationResult};
pub use validator::Validator;
