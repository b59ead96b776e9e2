//! Relief-site feed pipeline: normalize a tabular feed, classify freshness,
//! filter, and keep a map view and a list view showing the same records.

pub mod app;
pub mod classify;
pub mod data;
pub mod feed;
pub mod filter;
pub mod logging;
pub mod sink;
pub mod state;
pub mod style;
pub mod view;
