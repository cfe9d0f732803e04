use super::super::traits::SqlGenerator;

pub struct SqliteGenerator;

impl SqlGenerator for SqliteGenerator {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn pagination(&self, limit: u64, offset: u64) -> String {
        if offset > 0 {
            format!("LIMIT {} OFFSET {}", limit, offset)
        } else {
            format!("LIMIT {}", limit)
        }
    }

    fn max_parameters(&self) -> usize {
        32766
    }
}
