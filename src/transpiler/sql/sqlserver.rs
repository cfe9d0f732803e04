use super::super::traits::SqlGenerator;

pub struct SqlServerGenerator;

impl SqlGenerator for SqlServerGenerator {
    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn pagination(&self, limit: u64, offset: u64) -> String {
        // Syntax: OFFSET n ROWS FETCH NEXT m ROWS ONLY
        format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit)
    }

    fn requires_order_for_pagination(&self) -> bool {
        true
    }

    fn max_parameters(&self) -> usize {
        2100
    }
}
