//! Claim verifier
//!
//! Stores one immutable commitment per period and pays out each committed
//! leaf at most once.
//!
//! A claim is checked in full (commitment, proof, claim record, reserve)
//! before anything changes. Applying it marks the claim record and then
//! moves funds, both under the same exclusive borrow, so no other claim can
//! observe the record between the two steps.

use crate::{
    crypto::{leaf_hash, to_hex},
    merkle,
    treasury::Treasury,
    types::{Address, Amount, ClaimReceipt, ClaimRecord, Commitment, Hash, PeriodIndex},
    Error, Result,
};
use std::collections::{HashMap, HashSet};

/// Merkle-gated claim verifier
#[derive(Debug, Clone)]
pub struct ClaimVerifier {
    /// Only account allowed to register commitments
    operator: Address,

    /// Token paid out on claims
    token: Address,

    /// One commitment per period
    commitments: HashMap<PeriodIndex, Commitment>,

    /// Claimed (period, depositor) pairs; absence means unclaimed
    claimed: HashSet<(PeriodIndex, Address)>,

    /// Funds claims are paid from
    treasury: Treasury,
}

impl ClaimVerifier {
    /// Create a verifier administered by `operator`
    pub fn new(operator: Address, token: Address) -> Self {
        Self {
            operator,
            token,
            commitments: HashMap::new(),
            claimed: HashSet::new(),
            treasury: Treasury::new(),
        }
    }

    /// Operator account
    pub fn operator(&self) -> &Address {
        &self.operator
    }

    /// Register the commitment for a period (one-shot)
    pub fn register_commitment(&mut self, caller: &Address, commitment: Commitment) -> Result<()> {
        self.check_commitment(caller, &commitment)?;
        self.apply_commitment(commitment);
        Ok(())
    }

    /// Validate a commitment registration without touching state
    pub fn check_commitment(&self, caller: &Address, commitment: &Commitment) -> Result<()> {
        if caller != &self.operator {
            return Err(Error::Unauthorized(format!(
                "{} may not register commitments",
                caller
            )));
        }
        if self.commitments.contains_key(&commitment.period_index) {
            return Err(Error::AlreadyCommitted(commitment.period_index));
        }
        Ok(())
    }

    pub(crate) fn apply_commitment(&mut self, commitment: Commitment) {
        tracing::info!(
            period_index = commitment.period_index,
            root = %to_hex(&commitment.root),
            leaf_count = commitment.leaf_count,
            "Commitment registered"
        );
        self.commitments.insert(commitment.period_index, commitment);
    }

    /// Registered commitment for a period
    pub fn commitment(&self, period_index: PeriodIndex) -> Option<&Commitment> {
        self.commitments.get(&period_index)
    }

    /// Verify a claim and pay it out
    pub fn claim(
        &mut self,
        period_index: PeriodIndex,
        depositor: Address,
        proof: &[Hash],
        entitlement: Amount,
    ) -> Result<ClaimReceipt> {
        self.check_claim(period_index, &depositor, proof, entitlement)?;
        self.apply_claim(period_index, depositor, entitlement)
    }

    /// Validate a claim without touching state
    pub fn check_claim(
        &self,
        period_index: PeriodIndex,
        depositor: &Address,
        proof: &[Hash],
        entitlement: Amount,
    ) -> Result<()> {
        let commitment = self
            .commitments
            .get(&period_index)
            .ok_or(Error::NoCommitment(period_index))?;

        let leaf = leaf_hash(entitlement, depositor);
        if !merkle::verify(proof, &commitment.root, &leaf) {
            return Err(Error::InvalidProof {
                period_index,
                depositor: depositor.to_string(),
            });
        }

        if self.is_claimed(period_index, depositor) {
            return Err(Error::AlreadyClaimed {
                period_index,
                depositor: depositor.to_string(),
            });
        }

        self.treasury.check_transfer(entitlement)
    }

    /// Apply a claim that already passed `check_claim`
    ///
    /// The record is marked before funds move and unmarked if the transfer
    /// fails, so a failed payout never leaves the pair claimed.
    pub(crate) fn apply_claim(
        &mut self,
        period_index: PeriodIndex,
        depositor: Address,
        amount: Amount,
    ) -> Result<ClaimReceipt> {
        self.claimed.insert((period_index, depositor));
        if let Err(e) = self.treasury.transfer(&depositor, amount) {
            self.claimed.remove(&(period_index, depositor));
            return Err(e);
        }

        tracing::info!(
            period_index,
            depositor = %depositor,
            amount,
            "Claim paid"
        );

        Ok(ClaimReceipt {
            period_index,
            depositor,
            amount,
            token: self.token,
        })
    }

    /// Whether a (period, depositor) pair has been claimed
    pub fn is_claimed(&self, period_index: PeriodIndex, depositor: &Address) -> bool {
        self.claimed.contains(&(period_index, *depositor))
    }

    /// Claim record for a (period, depositor) pair
    pub fn claim_record(&self, period_index: PeriodIndex, depositor: &Address) -> ClaimRecord {
        ClaimRecord {
            period_index,
            depositor: *depositor,
            claimed: self.is_claimed(period_index, depositor),
        }
    }

    /// Add to the payout reserve
    pub fn fund(&mut self, amount: Amount) -> Result<Amount> {
        self.treasury.fund(amount)
    }

    /// Treasury backing the payouts
    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    const OPERATOR: Address = Address::from_bytes([0xee; 20]);
    const TOKEN: Address = Address::from_bytes([0x70; 20]);

    struct Fixture {
        verifier: ClaimVerifier,
        entries: Vec<(Address, Amount)>,
        tree: MerkleTree,
    }

    fn fixture(entries: Vec<(Address, Amount)>) -> Fixture {
        let tree = MerkleTree::from_leaves(entries.iter().map(|(a, e)| leaf_hash(*e, a)).collect());
        let mut verifier = ClaimVerifier::new(OPERATOR, TOKEN);
        verifier
            .register_commitment(
                &OPERATOR,
                Commitment {
                    period_index: 0,
                    root: tree.root(),
                    leaf_count: entries.len(),
                },
            )
            .unwrap();
        verifier.fund(1_000).unwrap();
        Fixture {
            verifier,
            entries,
            tree,
        }
    }

    #[test]
    fn test_only_operator_registers() {
        let mut verifier = ClaimVerifier::new(OPERATOR, TOKEN);
        let commitment = Commitment {
            period_index: 0,
            root: [1u8; 32],
            leaf_count: 1,
        };
        assert!(matches!(
            verifier.register_commitment(&addr(1), commitment),
            Err(Error::Unauthorized(_))
        ));
        assert!(verifier.commitment(0).is_none());
    }

    #[test]
    fn test_commitment_is_one_shot() {
        let mut f = fixture(vec![(addr(1), 10)]);
        let original = *f.verifier.commitment(0).unwrap();
        let replacement = Commitment {
            root: [9u8; 32],
            ..original
        };

        assert!(matches!(
            f.verifier.register_commitment(&OPERATOR, replacement),
            Err(Error::AlreadyCommitted(0))
        ));
        assert_eq!(f.verifier.commitment(0), Some(&original));
    }

    #[test]
    fn test_claim_once() {
        let mut f = fixture(vec![(addr(1), 10), (addr(2), 20), (addr(3), 30)]);

        for (i, (depositor, entitlement)) in f.entries.clone().into_iter().enumerate() {
            let proof = f.tree.proof(i).unwrap();
            let receipt = f.verifier.claim(0, depositor, &proof, entitlement).unwrap();
            assert_eq!(receipt.amount, entitlement);
            assert_eq!(receipt.token, TOKEN);
            assert!(f.verifier.is_claimed(0, &depositor));

            let again = f.verifier.claim(0, depositor, &proof, entitlement);
            assert!(matches!(again, Err(Error::AlreadyClaimed { .. })));
        }

        assert_eq!(f.verifier.treasury().reserve(), 1_000 - 60);
        assert_eq!(f.verifier.treasury().balance_of(&addr(2)), 20);
    }

    #[test]
    fn test_no_commitment() {
        let mut f = fixture(vec![(addr(1), 10)]);
        assert!(matches!(
            f.verifier.claim(1, addr(1), &[], 10),
            Err(Error::NoCommitment(1))
        ));
    }

    #[test]
    fn test_wrong_entitlement_is_invalid_proof() {
        let mut f = fixture(vec![(addr(1), 10), (addr(2), 20)]);
        let proof = f.tree.proof(0).unwrap();

        assert!(matches!(
            f.verifier.claim(0, addr(1), &proof, 11),
            Err(Error::InvalidProof { .. })
        ));
        assert!(!f.verifier.is_claimed(0, &addr(1)));
    }

    #[test]
    fn test_tampered_proof_rejected() {
        let mut f = fixture(vec![(addr(1), 10), (addr(2), 20), (addr(3), 30)]);
        let proof = f.tree.proof(1).unwrap();

        for node in 0..proof.len() {
            for byte in [0usize, 17, 31] {
                let mut tampered = proof.clone();
                tampered[node][byte] ^= 0x80;
                assert!(matches!(
                    f.verifier.claim(0, addr(2), &tampered, 20),
                    Err(Error::InvalidProof { .. })
                ));
            }
        }
        assert!(f.verifier.claim(0, addr(2), &proof, 20).is_ok());
    }

    #[test]
    fn test_short_reserve_leaves_claim_unset() {
        let mut f = fixture(vec![(addr(1), 5_000)]);

        let err = f.verifier.claim(0, addr(1), &[], 5_000).unwrap_err();
        assert!(err.is_retryable());
        assert!(!f.verifier.is_claimed(0, &addr(1)));

        // Retry after topping up succeeds
        f.verifier.fund(4_000).unwrap();
        f.verifier.claim(0, addr(1), &[], 5_000).unwrap();
        assert!(f.verifier.claim_record(0, &addr(1)).claimed);
    }
}
