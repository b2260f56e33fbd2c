use tracing::info;

use llm_client::{CompletionRequest, Completer, Gateway, GatewayError};
use skein_common::ClusterRecord;

use crate::engine::ClusterGroup;

/// Deterministic sampling, output bounded to roughly one sentence.
pub fn theme_request(posts: &str) -> CompletionRequest {
    CompletionRequest::new(format!(
        "What do the following posts have in common?\n\nPosts:\n\"\"\"\n{posts}\n\"\"\"\n\n\
         Answer with one short sentence.\n\nTheme:"
    ))
    .temperature(0.0)
    .max_tokens(64)
}

/// Ask the gateway for a one-line theme per cluster, ascending cluster id.
///
/// One cluster exhausting its retry budget aborts the whole run; nothing is
/// written for the clusters already labeled.
pub async fn label_clusters<C: Completer>(
    gateway: &Gateway<C>,
    groups: &[ClusterGroup],
) -> Result<Vec<ClusterRecord>, GatewayError> {
    let mut records = Vec::with_capacity(groups.len());

    for group in groups {
        let posts = group.combined.join("\n\n");
        let theme = gateway.invoke(&theme_request(&posts)).await?;

        info!(
            cluster = group.id,
            theme = theme.as_str(),
            members = group.links.len(),
            titles = ?group.titles,
            "cluster labeled"
        );

        records.push(ClusterRecord {
            posts: group.links.clone(),
            theme,
        });
    }

    Ok(records)
}
