pub mod chunking_service;
pub mod document_service;
pub mod embedding_service;
pub mod generation_service;
pub mod prompt_service;
pub mod review_service;
pub mod rule_match_service;
