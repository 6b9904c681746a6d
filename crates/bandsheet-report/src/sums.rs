//! Running aggregates behind `[^SUM(expr)^]`, `[^AVG(expr)^]` and `[^N^]`

use crate::expr::{Expr, Scope};
use crate::error::ReportResult;
use crate::value::Value;

/// Which records an accumulator sees before it is reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumScope {
    /// Never reset during a report
    Report,
    /// Reset whenever the header of group `i` (outermost = 0) is emitted
    Group(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumKind {
    Sum,
    Avg,
    Count,
}

/// One running aggregate, owned by the template cell that displays it
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub kind: SumKind,
    /// Evaluated per record; absent for counters
    pub expr: Option<Expr>,
    pub scope: SumScope,
    total: f64,
    count: u32,
}

impl Accumulator {
    pub fn new(kind: SumKind, expr: Option<Expr>, scope: SumScope) -> Self {
        Self {
            kind,
            expr,
            scope,
            total: 0.0,
            count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }

    /// Whether emitting the header of group `level` resets this accumulator
    pub fn resets_at(&self, level: usize) -> bool {
        matches!(self.scope, SumScope::Group(g) if g == level)
    }

    /// Fold the current record in
    ///
    /// Null and non-numeric results are skipped by sums and averages.
    pub fn update(&mut self, scope: &Scope) -> ReportResult<()> {
        let expr = match (&self.kind, &self.expr) {
            (SumKind::Count, _) | (_, None) => {
                self.count += 1;
                return Ok(());
            }
            (_, Some(expr)) => expr,
        };
        let value = scope.eval(expr)?;
        match value.as_number() {
            Some(n) => {
                self.total += n;
                self.count += 1;
            }
            None if value.is_none() => {}
            None => log::warn!("skipping non-numeric value '{}' in running sum", value),
        }
        Ok(())
    }

    pub fn value(&self) -> Value {
        match self.kind {
            SumKind::Sum => Value::Number(self.total),
            SumKind::Count => Value::Number(self.count as f64),
            SumKind::Avg if self.count == 0 => Value::None,
            SumKind::Avg => Value::Number(self.total / self.count as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parse_expr, CellInfo};
    use crate::functions::FunctionRegistry;
    use crate::query::QueryTable;
    use std::collections::BTreeMap;

    fn run(acc: &mut Accumulator, table: &QueryTable) -> Vec<Value> {
        let vars = BTreeMap::new();
        let functions = FunctionRegistry::new();
        table
            .records()
            .map(|record| {
                let scope = Scope::new(Some(record), &vars, &functions, CellInfo::default());
                acc.update(&scope).unwrap();
                acc.value()
            })
            .collect()
    }

    #[test]
    fn test_running_sum_and_reset() {
        let table = QueryTable::new(["x"], vec![vec![1.into()], vec![2.into()], vec![3.into()]]);
        let mut acc = Accumulator::new(SumKind::Sum, Some(parse_expr("x").unwrap()), SumScope::Group(0));
        assert_eq!(run(&mut acc, &table), vec![1.into(), 3.into(), 6.into()]);
        acc.reset();
        assert_eq!(acc.value(), Value::Number(0.0));
        assert!(acc.resets_at(0));
    }

    #[test]
    fn test_average_skips_nulls() {
        let table = QueryTable::new(["x"], vec![vec![2.into()], vec![Value::None], vec![4.into()]]);
        let mut acc = Accumulator::new(SumKind::Avg, Some(parse_expr("x").unwrap()), SumScope::Report);
        assert_eq!(acc.value(), Value::None);
        assert_eq!(run(&mut acc, &table).last(), Some(&Value::Number(3.0)));
        assert!(!acc.resets_at(0));
    }

    #[test]
    fn test_counter() {
        let table = QueryTable::new(["x"], vec![vec![Value::None]; 4]);
        let mut acc = Accumulator::new(SumKind::Count, None, SumScope::Group(1));
        assert_eq!(run(&mut acc, &table).last(), Some(&Value::Number(4.0)));
        assert!(acc.resets_at(1));
        assert!(!acc.resets_at(2));
    }
}
