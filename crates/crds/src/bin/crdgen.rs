//! Prints the MetalNode CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/metalnode.yaml`

use crds::MetalNode;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MetalNode::crd())?);
    Ok(())
}
