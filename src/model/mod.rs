//! Reference data model: pathway, module catalog and per-gene assignments

pub mod pathway;
pub mod catalog;
pub mod assignment;
pub mod reference;
