//! Commitment builder
//!
//! Turns the frozen depositor list of a closed period into a Merkle
//! commitment. Leaves follow ledger order; the same depositor list always
//! yields the same root.

use crate::{
    merkle::MerkleTree,
    types::{Address, Amount, ClaimLeaf, Commitment, Deposit, Hash, Period},
    Error, Result,
};

/// Builds commitments from closed periods
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitmentBuilder;

impl CommitmentBuilder {
    /// Build with each depositor entitled to exactly what they deposited
    pub fn build(period: &Period) -> Result<CommitmentTree> {
        Self::build_with(period, |deposit| deposit.amount)
    }

    /// Build with a caller-supplied entitlement per deposit
    pub fn build_with<F>(period: &Period, entitlement: F) -> Result<CommitmentTree>
    where
        F: Fn(&Deposit) -> Amount,
    {
        if period.is_open() {
            return Err(Error::PeriodOpen(period.index));
        }
        if period.depositors.is_empty() {
            return Err(Error::EmptyPeriod(period.index));
        }

        let leaves: Vec<ClaimLeaf> = period
            .depositors
            .iter()
            .map(|deposit| ClaimLeaf {
                period_index: period.index,
                depositor: deposit.depositor,
                entitlement: entitlement(deposit),
            })
            .collect();

        let tree = MerkleTree::from_leaves(leaves.iter().map(ClaimLeaf::hash).collect());

        tracing::debug!(
            period_index = period.index,
            leaf_count = leaves.len(),
            "Commitment tree built"
        );

        Ok(CommitmentTree {
            period_index: period.index,
            leaves,
            tree,
        })
    }
}

/// Merkle commitment over one period with its proofs
#[derive(Debug, Clone)]
pub struct CommitmentTree {
    period_index: u64,
    leaves: Vec<ClaimLeaf>,
    tree: MerkleTree,
}

impl CommitmentTree {
    /// Commitment record to publish
    pub fn commitment(&self) -> Commitment {
        Commitment {
            period_index: self.period_index,
            root: self.root(),
            leaf_count: self.leaf_count(),
        }
    }

    /// Period covered
    pub fn period_index(&self) -> u64 {
        self.period_index
    }

    /// Merkle root
    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Leaves in ledger order
    pub fn leaves(&self) -> &[ClaimLeaf] {
        &self.leaves
    }

    /// Proof for the leaf at `leaf_index`
    pub fn proof(&self, leaf_index: usize) -> Result<Vec<Hash>> {
        self.tree.proof(leaf_index).ok_or_else(|| {
            Error::NotFound(format!(
                "leaf {} in period {} ({} leaves)",
                leaf_index,
                self.period_index,
                self.leaves.len()
            ))
        })
    }

    /// Leaf and proof for a depositor
    pub fn proof_for(&self, depositor: &Address) -> Result<(ClaimLeaf, Vec<Hash>)> {
        let index = self
            .leaves
            .iter()
            .position(|leaf| &leaf.depositor == depositor)
            .ok_or_else(|| {
                Error::NotFound(format!("{} in period {}", depositor, self.period_index))
            })?;
        Ok((self.leaves[index], self.proof(index)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::verify;
    use crate::types::PeriodStatus;
    use chrono::Utc;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn closed_period(amounts: &[(u8, Amount)]) -> Period {
        let mut period = Period::open(0);
        for (b, amount) in amounts {
            period.depositors.push(Deposit {
                depositor: addr(*b),
                amount: *amount,
                period: 0,
            });
            period.total_deposited += amount;
        }
        period.status = PeriodStatus::Closed;
        period.closed_at = Some(Utc::now());
        period
    }

    #[test]
    fn test_open_period_rejected() {
        let period = Period::open(2);
        assert!(matches!(
            CommitmentBuilder::build(&period),
            Err(Error::PeriodOpen(2))
        ));
    }

    #[test]
    fn test_empty_closed_period_rejected() {
        let period = closed_period(&[]);
        assert!(matches!(
            CommitmentBuilder::build(&period),
            Err(Error::EmptyPeriod(0))
        ));
    }

    #[test]
    fn test_single_depositor_is_degenerate_tree() {
        let period = closed_period(&[(1, 42)]);
        let tree = CommitmentBuilder::build(&period).unwrap();

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root(), crate::crypto::leaf_hash(42, &addr(1)));
        assert!(tree.proof(0).unwrap().is_empty());
    }

    #[test]
    fn test_root_deterministic() {
        let period = closed_period(&[(1, 4), (2, 4), (3, 4)]);
        let a = CommitmentBuilder::build(&period).unwrap();
        let b = CommitmentBuilder::build(&period).unwrap();
        assert_eq!(a.root(), b.root());
        assert_eq!(a.commitment(), b.commitment());
    }

    #[test]
    fn test_proofs_verify() {
        let period = closed_period(&[(1, 4), (2, 5), (3, 6), (4, 7), (5, 8)]);
        let tree = CommitmentBuilder::build(&period).unwrap();

        for (i, leaf) in tree.leaves().iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify(&proof, &tree.root(), &leaf.hash()));
        }
        assert!(matches!(tree.proof(5), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_custom_entitlement() {
        let period = closed_period(&[(1, 4), (2, 6)]);
        let tree = CommitmentBuilder::build_with(&period, |d| d.amount * 10).unwrap();

        let (leaf, proof) = tree.proof_for(&addr(2)).unwrap();
        assert_eq!(leaf.entitlement, 60);
        assert!(verify(&proof, &tree.root(), &leaf.hash()));
        assert!(tree.proof_for(&addr(9)).is_err());
    }
}
