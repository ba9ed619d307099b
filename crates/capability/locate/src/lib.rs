//! # FMD 扇出定位流水线
//!
//! 对设备目录中的每台设备发起一次定位调用，汇总为按设备的报告表。
//!
//! ## 组成
//!
//! - [`traits`]：协作方接口（`DeviceDirectory`、`DeviceLocator`）与时钟
//! - [`error`]：目录错误、单设备定位错误、整轮扇出错误
//! - [`cache`]：按设备 ID 的短期缓存，同时作为失败兜底
//! - [`retry`]：单次调用的超时 + 指数退避重试（仅超时可重试）
//! - [`resolver`]：组合缓存与重试，单设备永不报错
//! - [`aggregator`]：并发上限内扇出所有设备并合并结果
//!
//! ## 失败语义
//!
//! - 设备目录失败：整轮失败，不返回部分结果
//! - 单设备失败：回退到旧缓存，没有缓存则该设备不出现在结果中
//! - 取消：中止所有在途调用与退避定时器，释放并发许可

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod traits;

pub use aggregator::{DEFAULT_MAX_CONCURRENCY, FanOutAggregator, merge_reports};
pub use cache::{DEFAULT_FRESHNESS_WINDOW, LocationCache};
pub use error::{DirectoryError, FanOutError, LocateError};
pub use resolver::LocationResolver;
pub use retry::{DEFAULT_BASE_DELAY, DEFAULT_LOCATE_TIMEOUT, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
pub use traits::{Clock, DeviceDirectory, DeviceLocator, SystemClock};
