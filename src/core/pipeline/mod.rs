//! The analysis pipeline, stage by stage.
//!
//! Every stage except statistics is lazy: it manipulates [`expr::ImageExpr`]
//! computation descriptions without contacting the geoprocessing service.
//! Only statistics and export force evaluation, through an
//! [`crate::service::ImageService`].
pub mod composite;
pub mod expr;
pub mod mask;
pub mod retrieval;
pub mod soil;
pub mod stats;
