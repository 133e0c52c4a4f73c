use kube::config::KubeConfigOptions;
use kube::{Client, Config};

/// Builds the `kube::Client` the scheduler scales workloads through:
/// in-cluster service-account config when `--incluster` is set, otherwise
/// the local kubeconfig, optionally pinned to `--context`.
pub async fn build(incluster: bool, context: Option<&str>) -> anyhow::Result<Client> {
    let config = if incluster {
        Config::incluster()?
    } else {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        Config::from_kubeconfig(&options).await?
    };
    Ok(Client::try_from(config)?)
}
