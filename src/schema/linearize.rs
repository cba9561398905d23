//! C3 linearization of schema parents.

/// Merge parent linearizations, C3 style.
///
/// `sequences` holds each parent's own linearization followed by the list of
/// direct parents. Returns `None` when no consistent order exists.
pub fn c3_merge<T: Clone + PartialEq>(mut sequences: Vec<Vec<T>>) -> Option<Vec<T>> {
    let mut out = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(out);
        }

        // A good head does not appear in the tail of any sequence.
        let head = sequences
            .iter()
            .map(|s| &s[0])
            .find(|&candidate| sequences.iter().all(|s| !s[1..].contains(candidate)))?
            .clone();

        for s in &mut sequences {
            if s[0] == head {
                s.remove(0);
            }
        }
        out.push(head);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lin(name: &'static str, parents: &[Vec<&'static str>]) -> Vec<&'static str> {
        let mut seqs: Vec<Vec<&str>> = parents.to_vec();
        seqs.push(parents.iter().map(|p| p[0]).collect());
        let mut out = vec![name];
        out.extend(c3_merge(seqs).expect("consistent"));
        out
    }

    #[test]
    fn diamond_with_shared_base() {
        let d = vec!["D"];
        let e = vec!["E"];
        let f = vec!["F"];
        let b = lin("B", &[d.clone(), e]);
        let c = lin("C", &[d, f]);
        let a = lin("A", &[b, c]);
        assert_eq!(a, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn inconsistent_order_is_rejected() {
        // X(A, B) and Y(B, A) cannot both be bases.
        let x = vec!["X", "A", "B"];
        let y = vec!["Y", "B", "A"];
        assert!(c3_merge(vec![x, y, vec!["X", "Y"]]).is_none());
    }
}
