pub mod epci_records;
pub mod generated_maps;
pub mod generation_logs;
pub mod geojson_templates;
pub mod reference_documents;
pub mod shared_map_links;
pub mod user_sessions;
pub mod users;
