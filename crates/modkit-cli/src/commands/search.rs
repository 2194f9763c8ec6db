//! Handler for `modkit search`.

use miette::Result;

use modkit_core::config::GlobalConfig;
use modkit_forge::ForgeClient;
use modkit_ops::ops_search;

use crate::cli::RenderAs;

pub async fn exec(term: &str, forge_url: Option<String>, render_as: RenderAs) -> Result<bool> {
    let config = GlobalConfig::load()?;
    let url = forge_url.unwrap_or(config.forge.url);
    modkit_util::progress::set_quiet(render_as == RenderAs::Json);

    let client = ForgeClient::new(&url)?;
    let results = ops_search::search(&client, term).await?;
    match render_as {
        RenderAs::Json => {
            let json = serde_json::to_string_pretty(&results).map_err(|e| modkit_util::errors::ModkitError::Generic {
                message: format!("could not render results: {e}"),
            })?;
            println!("{json}");
        }
        RenderAs::Human => print!("{}", ops_search::format_results(&results)),
    }
    Ok(true)
}
