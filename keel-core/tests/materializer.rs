#[cfg(test)]
mod tests {
    use keel_core::{Cardinality, Collapsed, Materializer, Value, collapse};

    #[derive(Debug, PartialEq)]
    struct Parent {
        id: i64,
    }

    fn rows() -> Vec<(i64, &'static str)> {
        vec![
            (1, "a1"),
            (1, "a2"),
            (2, "b1"),
            (2, "b2"),
            (3, "c1"),
            (3, "c2"),
        ]
    }

    fn materialize(
        rows: &[(Option<i64>, &'static str)],
        limit: Option<usize>,
    ) -> (Vec<(Parent, Vec<Value>)>, usize) {
        let mut materializer = Materializer::new(limit, 1);
        let mut consumed = 0;
        for &(key, child) in rows {
            let more = materializer
                .push(
                    key.map(|v| Value::Int64(Some(v))),
                    || Ok(Parent { id: key.unwrap_or(-1) }),
                    vec![child.into()],
                )
                .unwrap();
            if !more {
                break;
            }
            consumed += 1;
        }
        let groups = materializer
            .finish()
            .into_iter()
            .map(|mut group| (group.entity, group.joined.remove(0)))
            .collect();
        (groups, consumed)
    }

    #[test]
    fn limit_stops_at_group_boundary() {
        let rows = rows()
            .into_iter()
            .map(|(k, v)| (Some(k), v))
            .collect::<Vec<_>>();
        let (groups, consumed) = materialize(&rows, Some(2));
        assert_eq!(groups.len(), 2);
        assert_eq!(consumed, 4);
        assert_eq!(groups[0].0, Parent { id: 1 });
        assert_eq!(groups[0].1, vec![Value::from("a1"), Value::from("a2")]);
        assert_eq!(groups[1].0, Parent { id: 2 });
        assert_eq!(groups[1].1, vec![Value::from("b1"), Value::from("b2")]);
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let rows = [
            (Some(2), "x"),
            (Some(1), "y"),
            (Some(2), "z"),
            (Some(3), "w"),
        ];
        let (groups, consumed) = materialize(&rows, None);
        assert_eq!(consumed, 4);
        let ids = groups.iter().map(|v| v.0.id).collect::<Vec<_>>();
        assert_eq!(ids, [2, 1, 3]);
        assert_eq!(groups[0].1, vec![Value::from("x"), Value::from("z")]);
    }

    #[test]
    fn keyless_rows_are_distinct() {
        let rows = [(None, "x"), (None, "x"), (None, "y")];
        let (groups, _) = materialize(&rows, None);
        assert_eq!(groups.len(), 3);
        let (groups, consumed) = materialize(&rows, Some(1));
        assert_eq!(groups.len(), 1);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn decode_runs_once_per_group() {
        let mut materializer = Materializer::new(None, 0);
        let mut decoded = 0;
        for key in [5, 5, 5, 6] {
            materializer
                .push(
                    Some(Value::Int32(Some(key))),
                    || {
                        decoded += 1;
                        Ok(key)
                    },
                    Vec::new(),
                )
                .unwrap();
        }
        assert_eq!(decoded, 2);
        assert_eq!(materializer.len(), 2);
    }

    #[test]
    fn decode_errors_propagate() {
        let mut materializer = Materializer::<i32>::new(None, 0);
        let result = materializer.push(
            Some(Value::Int32(Some(1))),
            || Err(keel_core::Error::msg("broken row")),
            Vec::new(),
        );
        assert!(result.is_err());
        assert!(materializer.is_empty());
    }

    #[test]
    fn collapse_groups() {
        let (groups, _) = materialize(
            &rows()
                .into_iter()
                .map(|(k, v)| (Some(k), v))
                .collect::<Vec<_>>(),
            None,
        );
        for (_, children) in groups {
            assert!(matches!(
                collapse(Cardinality::Many, "child.name", children.clone()).unwrap(),
                Collapsed::Many(v) if v.len() == 2
            ));
            assert!(collapse(Cardinality::One, "child.name", children).is_err());
        }
    }
}
