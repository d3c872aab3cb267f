//! Property-based tests for FIFO lot draws.

use chrono::NaiveDate;
use folio_shared::types::{ProductId, TenantId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::allocator::{available_quantity, consume, restore};
use super::lot::{CostLot, LotSource};
use crate::ledger::SourceRef;

#[derive(Debug, Clone)]
enum Op {
    Receive { quantity: u32, unit_cost_cents: u32, day: u32 },
    Consume { quantity: u32 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..50, 1u32..10_000, 1u32..28).prop_map(|(quantity, unit_cost_cents, day)| Op::Receive {
            quantity,
            unit_cost_cents,
            day
        }),
        (1u32..60).prop_map(|quantity| Op::Consume { quantity }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Remaining never exceeds original, and every draw costs exactly the
    /// lots it touched, oldest first.
    #[test]
    fn prop_fifo_monotonic(ops in prop::collection::vec(op(), 1..40)) {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut lots: Vec<CostLot> = Vec::new();
        let mut sequence = 0i64;

        for op in ops {
            match op {
                Op::Receive { quantity, unit_cost_cents, day } => {
                    sequence += 1;
                    let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
                    lots.push(
                        CostLot::new(
                            tenant,
                            product,
                            Decimal::from(quantity),
                            Decimal::new(i64::from(unit_cost_cents), 2),
                            date,
                            LotSource::Purchase,
                        )
                        .with_sequence(sequence),
                    );
                }
                Op::Consume { quantity } => {
                    let requested = Decimal::from(quantity);
                    let before = lots.clone();
                    match consume(product, &mut lots, requested) {
                        Ok(consumption) => {
                            let sliced: Decimal =
                                consumption.slices.iter().map(|s| s.quantity).sum();
                            prop_assert_eq!(sliced, requested);

                            let expected: Decimal = consumption
                                .slices
                                .iter()
                                .map(|s| s.quantity * s.unit_cost)
                                .sum();
                            prop_assert_eq!(consumption.total_cost, expected);

                            // Slices follow FIFO order.
                            let keys: Vec<_> = consumption
                                .slices
                                .iter()
                                .map(|s| {
                                    before.iter().find(|l| l.id == s.lot_id).unwrap().fifo_key()
                                })
                                .collect();
                            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));

                            // Every lot older than the last touched one is exhausted.
                            if let Some(last) = keys.last() {
                                prop_assert!(lots
                                    .iter()
                                    .filter(|l| l.fifo_key() < *last)
                                    .all(CostLot::is_exhausted));
                            }
                        }
                        Err(_) => prop_assert_eq!(&lots, &before),
                    }
                }
            }

            for lot in &lots {
                prop_assert!(lot.remaining_quantity >= Decimal::ZERO);
                prop_assert!(lot.remaining_quantity <= lot.original_quantity);
            }
        }
    }

    /// Restoring a draw puts every lot back where it was.
    #[test]
    fn prop_restore_inverts_consume(
        quantities in prop::collection::vec(1u32..20, 1..8),
        draw in 1u32..100,
    ) {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut lots: Vec<CostLot> = quantities
            .iter()
            .zip(1i64..)
            .map(|(q, seq)| {
                let (quantity, cost) = (Decimal::from(*q), Decimal::from(seq));
                CostLot::new(tenant, product, quantity, cost, date, LotSource::Purchase)
                    .with_sequence(seq)
            })
            .collect();
        let requested = Decimal::from(draw);
        prop_assume!(requested <= available_quantity(&lots));

        let before = lots.clone();
        let consumption = consume(product, &mut lots, requested).unwrap();
        restore(&mut lots, &consumption.records(tenant, product, SourceRef::manual())).unwrap();
        prop_assert_eq!(lots, before);
    }
}
