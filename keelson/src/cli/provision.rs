use clap::Args;
use snafu::ResultExt;
use tokio::io::AsyncWriteExt;

use crate::{
    cli::error::{self, Error},
    config::Config,
    provisioner::{ProcessRunner, Provisioner},
    ui::table::SummaryExt,
};

#[derive(Args, Clone)]
pub struct ProvisionCommand {
    #[arg(
        short = 'n',
        long = "cluster-name",
        help = "Name for the cluster. Overrides the `clusterName` value from the configuration \
                file."
    )]
    pub cluster_name: Option<String>,
}

impl ProvisionCommand {
    /// Runs the full provisioning sequence and prints the captured resource
    /// identifiers.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if any provisioning step fails or the summary
    /// cannot be written to stdout.
    pub async fn run(self, mut config: Config) -> Result<(), Error> {
        if let Some(cluster_name) = self.cluster_name.filter(|name| !name.is_empty()) {
            config.cluster_name = cluster_name;
        }

        let summary = Provisioner::new(config, ProcessRunner).run().await?;

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(summary.render_table().as_bytes())
            .await
            .context(error::WriteStdoutSnafu)?;
        stdout.write_u8(b'\n').await.context(error::WriteStdoutSnafu)?;

        Ok(())
    }
}
