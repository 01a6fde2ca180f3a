pub mod auth_service;
pub mod authorization;
pub mod epci_service;
pub mod generated_map_service;
pub mod generation_log_service;
pub mod generation_service;
pub mod geojson_template_service;
pub mod layer_service;
pub mod reference_document_service;
pub mod share_service;
pub mod validation;

pub use auth_service::AuthService;
pub use authorization::{Actor, AuthorizationService, Role};
pub use epci_service::EpciService;
pub use generated_map_service::GeneratedMapService;
pub use generation_log_service::GenerationLogService;
pub use generation_service::{GenerateRequest, GenerationResult, GenerationService};
pub use geojson_template_service::GeojsonTemplateService;
pub use layer_service::StaticLayerService;
pub use reference_document_service::ReferenceDocumentService;
pub use share_service::ShareService;
pub use validation::ValidationService;
