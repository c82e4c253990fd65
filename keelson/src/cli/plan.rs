use clap::Args;
use snafu::ResultExt;
use tokio::io::AsyncWriteExt;

use crate::{
    cli::error::{self, Error},
    config::Config,
    provisioner::{DryRunRunner, Provisioner},
};

#[derive(Args, Clone)]
pub struct PlanCommand {
    #[arg(
        short = 'n',
        long = "cluster-name",
        help = "Name for the cluster. Overrides the `clusterName` value from the configuration \
                file."
    )]
    pub cluster_name: Option<String>,
}

impl PlanCommand {
    /// Prints the command sequence `provision` would execute, without
    /// touching any external system.
    ///
    /// Identifiers that would be captured from command output are shown as
    /// placeholders such as `<vpc-id>`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if manifest rendering fails or the plan cannot
    /// be written to stdout.
    pub async fn run(self, mut config: Config) -> Result<(), Error> {
        if let Some(cluster_name) = self.cluster_name.filter(|name| !name.is_empty()) {
            config.cluster_name = cluster_name;
        }

        let runner = DryRunRunner::new();
        let _summary = Provisioner::new(config, &runner).run().await?;

        let mut stdout = tokio::io::stdout();
        for invocation in runner.recorded() {
            stdout
                .write_all(invocation.render().as_bytes())
                .await
                .context(error::WriteStdoutSnafu)?;
            stdout.write_u8(b'\n').await.context(error::WriteStdoutSnafu)?;
        }

        Ok(())
    }
}
