pub mod channel_combiner;
pub mod channel_merger;
pub mod dataset_fuser;
pub mod station_matcher;

pub use channel_combiner::ChannelCombiner;
pub use channel_merger::{merge_tables, ChannelMerger};
pub use dataset_fuser::{CleanSummary, DatasetCleaner, DatasetFuser, FuseSummary};
pub use station_matcher::{DailyMatcher, MatchSummary, StationMatcher};
