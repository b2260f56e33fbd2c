pub mod dataset;
pub mod engine;
pub mod themes;

pub use dataset::{dedup_by_link, load_dataset, validate_dimensions};
pub use engine::{
    cluster_count, group_records, ClusterGroup, ClusterStrategy, GaussianMixture, KMeans,
};
pub use themes::{label_clusters, theme_request};
