//! Domain models with validation at construction
//!
//! Request bodies arrive as loose `*Request` structs and are turned into
//! validated values by `validate()`, which collects every field failure.

pub mod validation;
pub mod pagination;
pub mod status;
pub mod role;
pub mod catalog;
pub mod entities;
pub mod credentials;
pub mod service;
pub mod order;
pub mod quote;
pub mod lab;

pub use validation::{FieldIssue, ValidationError, ValidationErrors};
pub use pagination::{PageInfo, Paginated, Pagination, PaginationParams};
pub use status::OrderStatus;
pub use role::UserRole;
pub use catalog::{AttachmentType, PricingMode, ServiceCategory};
pub use entities::{
    Attachment, ClientDetails, ClientSummary, Coordinates, Lab, LabCard, LabLocation, LabService,
    LabSummary, Order, OrderFact, OrderView, ServiceSummary, ServiceWithLab, ShippingAddress, User,
};
pub use credentials::{check_password_policy, Email, SignInRequest, SignUp, SignUpRequest};
pub use service::{BulkAction, BulkActionRequest, ServiceDraft, ServiceFilter, ServiceInput, ServiceQuery};
pub use order::{
    ClientDetailsInput, CreateOrderRequest, OrderQuery, OrderSubmission, OrderUpdate, ResultFile,
    ShippingAddressInput, UpdateOrderRequest,
};
pub use quote::{CustomQuoteRequest, ProvideQuoteRequest, Quote, QuoteDecision, QuoteDecisionRequest};
pub use lab::{LabLocationInput, LabProfile, LabProfileRequest};
