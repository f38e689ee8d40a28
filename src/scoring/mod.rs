//! 分数计算（纯函数，不调用 LLM）
//!
//! - `band` - 半分取整、分数合法性、锚点
//! - `gates` - 各评分项的封顶规则
//! - `aggregator` - 总分

pub mod aggregator;
pub mod band;
pub mod gates;

pub use aggregator::{aggregate, overall_band};
pub use band::{anchor_for, is_valid_band, round_to_half};
pub use gates::{apply_caps, effective_cap, CappedBand, Gate};
