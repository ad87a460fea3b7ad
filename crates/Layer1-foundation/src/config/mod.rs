//! Config - 섹션 기반 설정 관리
//!
//! - `store.rs` - ConfigStore (TOML 파일, 섹션 단위 key/value)

mod store;

pub use store::{ConfigStore, Section, CONFIG_FILE, DEFAULT_SECTION};
