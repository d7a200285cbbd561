//! IO modules - side effects (network, archives)

pub mod archive;
pub mod fetch;
