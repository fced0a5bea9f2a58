//! 业务服务层

pub mod mapping_service;

pub use mapping_service::{MappingError, ModelMappingService};
