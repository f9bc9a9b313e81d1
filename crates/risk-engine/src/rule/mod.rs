//! 탐지 규칙 -- 카탈로그, 분류기, YAML 로더
//!
//! 규칙은 정규식 패턴과 메시지의 쌍이며 `high`, `medium`, `low` 등급 중 하나에 속합니다.
//!
//! # 아키텍처
//! - [`RuleCatalog`]: 등급별로 정렬된 불변 규칙 테이블 (내장 규칙 + 확장 규칙)
//! - [`LineClassifier`]: 한 라인을 카탈로그 전체와 대조하는 순수 분류기
//! - [`RuleLoader`]: YAML 확장 규칙 파일 로딩 및 유효성 검증
//! - [`types`]: 규칙 정의 구조체

pub mod catalog;
pub mod classifier;
pub mod loader;
pub mod types;

pub use catalog::{CompiledRule, RuleCatalog, builtin_specs};
pub use classifier::{LineCategory, LineClassifier, RuleMatch};
pub use loader::RuleLoader;
pub use types::RuleSpec;
