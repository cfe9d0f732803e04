use super::super::traits::SqlGenerator;

pub struct PostgresGenerator;

impl SqlGenerator for PostgresGenerator {
    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn pagination(&self, limit: u64, offset: u64) -> String {
        if offset > 0 {
            format!("LIMIT {} OFFSET {}", limit, offset)
        } else {
            format!("LIMIT {}", limit)
        }
    }

    fn max_parameters(&self) -> usize {
        u16::MAX as usize
    }
}
