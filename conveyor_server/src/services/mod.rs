//! External collaborators — forge APIs, build systems, lookups, storage.

pub mod bodhi;
pub mod branches;
pub mod build_records;
pub mod copr;
pub mod forge;
pub mod koji;
pub mod packagers;
pub mod projects;
pub mod reporting;
