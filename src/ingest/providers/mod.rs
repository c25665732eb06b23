pub mod status_rss;
