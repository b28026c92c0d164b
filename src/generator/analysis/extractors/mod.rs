//! 分析阶段的四个独立提取器。互不依赖，由协调器并发扇出

pub mod keyword_planner;
pub mod product_mapper;
pub mod structure_authority;
pub mod visual_style;
