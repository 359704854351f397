//! Config-category edge builders: one per configuration ecosystem.
//!
//! Ported from `edges/config/__init__.py`'s builder roster: a generic
//! key-extraction builder plus six ecosystem-specific builders (Docker,
//! Terraform, Helm, Kubernetes, CI/CD, Makefile/CMake), each gated on its
//! own file-detection predicate so non-matching universes return no edges
//! immediately.

mod build;
mod cicd;
mod docker;
mod generic;
mod helm;
mod kubernetes;
mod terraform;

pub use build::BuildSystemEdgeBuilder;
pub use cicd::CicdEdgeBuilder;
pub use docker::DockerEdgeBuilder;
pub use generic::ConfigCodeEdgeBuilder;
pub use helm::HelmEdgeBuilder;
pub use kubernetes::KubernetesEdgeBuilder;
pub use terraform::TerraformEdgeBuilder;
