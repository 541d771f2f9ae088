use std::fmt::Write;

use super::Plan;

impl Plan {
    /// Indented operator tree, root first, two spaces per level.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        render(&mut out, self, 0);
        out.trim_end().to_string()
    }
}

fn render(out: &mut String, plan: &Plan, depth: usize) {
    let pad = "  ".repeat(depth);
    match plan {
        Plan::Argument { columns } => {
            let _ = writeln!(out, "{pad}Argument(columns={columns:?})");
        }
        Plan::Input { columns } => {
            let _ = writeln!(out, "{pad}Input(columns={columns:?})");
        }
        Plan::AllNodeScan { alias } => {
            let _ = writeln!(out, "{pad}AllNodeScan(alias={alias})");
        }
        Plan::LabelScan { alias, label } => {
            let _ = writeln!(out, "{pad}LabelScan(alias={alias}, label={label})");
        }
        Plan::IndexSeek {
            alias,
            label,
            property,
            predicates,
        } => {
            let _ = writeln!(
                out,
                "{pad}IndexSeek(alias={alias}, index=:{label}({property}), predicates={predicates:?})"
            );
        }
        Plan::Expand {
            from,
            relationship,
            to,
            direction,
            types,
            ..
        } => {
            let _ = writeln!(
                out,
                "{pad}Expand(from={from}, rel={relationship}, to={to}, dir={direction:?}, types={types:?})"
            );
        }
        Plan::CartesianProduct { .. } => {
            let _ = writeln!(out, "{pad}CartesianProduct");
        }
        Plan::Apply { .. } => {
            let _ = writeln!(out, "{pad}Apply");
        }
        Plan::HashJoin { keys, .. } => {
            let _ = writeln!(out, "{pad}HashJoin(keys={keys:?})");
        }
        Plan::Filter { predicate, .. } => {
            let _ = writeln!(out, "{pad}Filter(predicate={predicate:?})");
        }
        Plan::Projection { items, .. } => {
            let names: Vec<&str> = items.iter().map(|(name, _)| name.as_str()).collect();
            let _ = writeln!(out, "{pad}Projection(items={names:?})");
        }
        Plan::Sort { items, .. } => {
            let keys: Vec<String> = items
                .iter()
                .map(|item| format!("{} {:?}", item.column, item.direction))
                .collect();
            let _ = writeln!(out, "{pad}Sort(keys={keys:?})");
        }
        Plan::Skip { count, .. } => {
            let _ = writeln!(out, "{pad}Skip(count={count:?})");
        }
        Plan::Limit { count, .. } => {
            let _ = writeln!(out, "{pad}Limit(count={count:?})");
        }
        Plan::ProduceResults { columns, .. } => {
            let _ = writeln!(out, "{pad}ProduceResults(columns={columns:?})");
        }
    }
    for child in plan.children() {
        render(out, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Expression;
    use crate::executor::Plan;

    #[test]
    fn explain_indents_children_left_to_right() {
        let plan = Plan::ProduceResults {
            columns: vec!["a".into(), "b".into()],
            input: Box::new(Plan::CartesianProduct {
                left: Box::new(Plan::AllNodeScan { alias: "a".into() }),
                right: Box::new(Plan::Limit {
                    input: Box::new(Plan::AllNodeScan { alias: "b".into() }),
                    count: Expression::lit(2),
                }),
            }),
        };
        let expected = [
            r#"ProduceResults(columns=["a", "b"])"#,
            "  CartesianProduct",
            "    AllNodeScan(alias=a)",
            "    Limit(count=Literal(Integer(2)))",
            "      AllNodeScan(alias=b)",
        ]
        .join("\n");
        assert_eq!(plan.explain(), expected);
    }
}
