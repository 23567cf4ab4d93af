pub mod grade_service;
