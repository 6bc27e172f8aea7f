use anchor_lang::prelude::*;
use proptest::prelude::*;

use super::*;
use crate::constants::SECONDS_PER_DAY;
use crate::ledger::{FixedClock, MemoryLedger};
use crate::state::{AccountPayload, ContractState, PeriodUnit, ScheduleOverride, UnitSchedule};

const T0: i64 = 1_700_000_000;
const REQUEST: u64 = 7;

fn schedule() -> UnitSchedule {
    UnitSchedule {
        period_unit: PeriodUnit::Days,
        period_count: 1,
        amount_per_installment: 100_000,
        prepaid_minimum: 10,
        total_installments: 100,
        termination_fee_installments: 1,
    }
}

struct Harness {
    ledger: MemoryLedger,
    slots: SlotClock,
    sender: Pubkey,
    recipient: Pubkey,
    now: i64,
}

impl Harness {
    fn new(sender_balance: u64) -> Self {
        let mut ledger = MemoryLedger::new();
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        ledger.open(&sender, sender_balance);
        Self {
            ledger,
            slots: SlotClock::default(),
            sender,
            recipient,
            now: T0,
        }
    }

    fn run(&mut self, caller: Pubkey, op: &Operation) -> TransitionResult {
        let clock = FixedClock(self.now);
        let ctx = OperationContext::new(
            Invocation {
                caller,
                request_id: REQUEST,
            },
            &clock,
            &self.slots,
        );
        op.prepare(&ctx, &mut self.ledger).map_err(|e| ctx.fail(e))?;
        op.apply(&ctx, &mut self.ledger)
    }

    fn revert(&mut self, caller: Pubkey, op: &Operation) -> TransitionResult {
        let clock = FixedClock(self.now);
        let ctx = OperationContext::new(
            Invocation {
                caller,
                request_id: REQUEST,
            },
            &clock,
            &self.slots,
        );
        op.undo(&ctx, &mut self.ledger)
    }

    fn create_op(&self, schedule: UnitSchedule) -> CreateContract {
        CreateContract {
            contract_public_key: None,
            schedule,
            sender: self.sender,
            recipient: self.recipient,
            title: "rent".to_string(),
            timestamp: T0 as u32,
            data: String::new(),
        }
    }

    /// Sender proposes, recipient accepts. Returns the contract key.
    fn accepted(&mut self, schedule: UnitSchedule) -> Pubkey {
        let create = self.create_op(schedule);
        let key = create.contract_public_key();
        self.run(self.sender, &Operation::Create(create)).unwrap();
        self.run(self.recipient, &accept(key)).unwrap();
        key
    }

    fn funded(&mut self, schedule: UnitSchedule, units: u16) -> Pubkey {
        let key = self.accepted(schedule);
        self.run(self.sender, &fund(key, units)).unwrap();
        key
    }

    fn contract(&self, key: &Pubkey) -> Contract {
        self.ledger
            .get_or_default(&address_from_public_key(key))
            .unwrap()
            .contract()
            .cloned()
            .unwrap()
    }

    fn escrow(&self, key: &Pubkey) -> u64 {
        self.ledger.balance_of(key)
    }

    fn snapshot(&self, keys: &[Pubkey]) -> Vec<LedgerAccount> {
        keys.iter()
            .map(|k| {
                self.ledger
                    .get_or_default(&address_from_public_key(k))
                    .unwrap()
            })
            .collect()
    }
}

fn accept(key: Pubkey) -> Operation {
    Operation::Review(ReviewContract {
        contract_public_key: key,
        accept: true,
        revision: None,
        unit: None,
        unit_old: None,
        data: String::new(),
    })
}

fn counter(key: Pubkey, unit: ScheduleOverride, unit_old: ScheduleOverride) -> Operation {
    Operation::Review(ReviewContract {
        contract_public_key: key,
        accept: false,
        revision: None,
        unit: Some(unit),
        unit_old: Some(unit_old),
        data: String::new(),
    })
}

fn fund(key: Pubkey, units: u16) -> Operation {
    Operation::Fund(FundContract {
        contract_public_key: key,
        units,
        data: String::new(),
    })
}

fn claim(key: Pubkey, installment_index: u16) -> Operation {
    Operation::RequestPayment(RequestPayment {
        contract_public_key: key,
        installment_index,
        data: String::new(),
    })
}

fn terminate(key: Pubkey, peer: Pubkey, installment_index: u16) -> Operation {
    Operation::Terminate(TerminateContract {
        contract_public_key: key,
        peer_public_key: peer,
        installment_index,
        data: String::new(),
    })
}

fn codes(result: TransitionResult) -> Vec<PaymentError> {
    result
        .expect_err("transition should be rejected")
        .into_iter()
        .map(|e| e.code)
        .collect()
}

#[test]
fn create_awaits_the_other_party() {
    let mut h = Harness::new(0);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    h.run(h.sender, &Operation::Create(create)).unwrap();

    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::RecipientReview);
    assert_eq!(c.public_key, key);
    assert_eq!(c.schedule, schedule());
    assert_eq!(c.installments_paid, 0);
    assert_eq!(h.escrow(&key), 0);

    let mut h = Harness::new(0);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    h.run(h.recipient, &Operation::Create(create)).unwrap();
    assert_eq!(h.contract(&key).state, ContractState::SenderReview);
}

#[test]
fn create_rejects_duplicates_and_outsiders() {
    let mut h = Harness::new(0);
    let op = Operation::Create(h.create_op(schedule()));
    h.run(h.sender, &op).unwrap();
    assert_eq!(
        codes(h.run(h.sender, &op)),
        vec![PaymentError::DuplicateContract]
    );

    let mut h = Harness::new(0);
    let op = Operation::Create(h.create_op(schedule()));
    assert_eq!(
        codes(h.run(Pubkey::new_unique(), &op)),
        vec![PaymentError::Unauthorized]
    );
}

#[test]
fn create_reports_every_schema_violation() {
    let mut h = Harness::new(0);
    let mut create = h.create_op(UnitSchedule {
        period_count: 0,
        prepaid_minimum: 0,
        ..schedule()
    });
    create.contract_public_key = Some(Pubkey::new_unique());
    let errors = h.run(h.sender, &Operation::Create(create)).unwrap_err();

    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(
        fields,
        vec![
            "schedule.period_count",
            "schedule.prepaid_minimum",
            "contract_public_key"
        ]
    );
    assert!(errors
        .iter()
        .all(|e| e.code == PaymentError::SchemaViolation && e.request_id == REQUEST));
    assert_eq!(h.ledger.len(), 1);
}

#[test]
fn review_turns_alternate() {
    let mut h = Harness::new(0);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    h.run(h.sender, &Operation::Create(create)).unwrap();

    // Sender cannot review its own proposal.
    assert_eq!(
        codes(h.run(h.sender, &accept(key))),
        vec![PaymentError::Unauthorized]
    );

    let raise = ScheduleOverride {
        amount_per_installment: Some(120_000),
        ..Default::default()
    };
    let was = ScheduleOverride {
        amount_per_installment: Some(100_000),
        ..Default::default()
    };
    h.run(h.recipient, &counter(key, raise, was)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::SenderReview);
    assert_eq!(c.schedule.amount_per_installment, 120_000);
    assert_eq!(c.revision, 1);

    assert_eq!(
        codes(h.run(h.recipient, &accept(key))),
        vec![PaymentError::Unauthorized]
    );
    h.now = T0 + 60;
    h.run(h.sender, &accept(key)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::Accepted);
    assert_eq!(c.start_ts, T0 + 60);

    assert_eq!(
        codes(h.run(h.recipient, &accept(key))),
        vec![PaymentError::InvalidState]
    );
}

#[test]
fn review_rejects_stale_restatement() {
    let mut h = Harness::new(0);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    h.run(h.sender, &Operation::Create(create)).unwrap();

    let unit = ScheduleOverride {
        amount_per_installment: Some(120_000),
        ..Default::default()
    };
    let stale = ScheduleOverride {
        amount_per_installment: Some(90_000),
        ..Default::default()
    };
    let errors = h.run(h.recipient, &counter(key, unit, stale)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, PaymentError::SequenceMismatch);
    assert_eq!(errors[0].field, "unit_old.amount_per_installment");
    assert_eq!(errors[0].actual, "90000");
    assert_eq!(errors[0].expected, "100000");
    assert_eq!(h.contract(&key).schedule, schedule());
}

#[test]
fn review_rejects_mismatched_or_empty_overrides() {
    let mut h = Harness::new(0);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    h.run(h.sender, &Operation::Create(create)).unwrap();

    let unit = ScheduleOverride {
        amount_per_installment: Some(120_000),
        ..Default::default()
    };
    let other_keys = ScheduleOverride {
        total_installments: Some(100),
        ..Default::default()
    };
    assert_eq!(
        codes(h.run(h.recipient, &counter(key, unit, other_keys))),
        vec![PaymentError::SchemaViolation]
    );
    assert_eq!(
        codes(h.run(
            h.recipient,
            &counter(key, ScheduleOverride::default(), ScheduleOverride::default())
        )),
        vec![PaymentError::SchemaViolation]
    );

    let stale_revision = Operation::Review(ReviewContract {
        contract_public_key: key,
        accept: true,
        revision: Some(3),
        unit: None,
        unit_old: None,
        data: String::new(),
    });
    assert_eq!(
        codes(h.run(h.recipient, &stale_revision)),
        vec![PaymentError::SequenceMismatch]
    );
}

#[test]
fn fund_activates_and_fills_escrow() {
    let mut h = Harness::new(2_000_000);
    let key = h.accepted(schedule());
    h.now = T0 + 500;
    h.run(h.sender, &fund(key, 12)).unwrap();

    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::Active);
    assert_eq!(c.start_ts, T0 + 500);
    assert_eq!(h.escrow(&key), 1_200_000);
    assert_eq!(h.ledger.balance_of(&h.sender), 800_000);
}

#[test]
fn prepaid_minimum_only_binds_the_first_deposit() {
    let mut h = Harness::new(2_000_000);
    let key = h.accepted(schedule());
    assert_eq!(
        codes(h.run(h.sender, &fund(key, 5))),
        vec![PaymentError::ScheduleViolation]
    );
    assert_eq!(h.contract(&key).state, ContractState::Accepted);

    h.run(h.sender, &fund(key, 12)).unwrap();
    h.run(h.sender, &fund(key, 5)).unwrap();
    assert_eq!(h.escrow(&key), 1_700_000);
}

#[test]
fn fund_is_capped_by_remaining_installments() {
    let mut h = Harness::new(20_000_000);
    let key = h.funded(
        UnitSchedule {
            total_installments: 12,
            ..schedule()
        },
        10,
    );
    // Escrowed but unpaid installments do not count against the cap.
    assert_eq!(
        codes(h.run(h.sender, &fund(key, 13))),
        vec![PaymentError::ScheduleViolation]
    );
    h.run(h.sender, &fund(key, 12)).unwrap();

    h.now = T0 + SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 1)).unwrap();
    assert_eq!(h.contract(&key).installments_paid, 1);
    let errors = h.run(h.sender, &fund(key, 12)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, PaymentError::ScheduleViolation);
    assert_eq!(errors[0].expected, "<= 11");
    h.run(h.sender, &fund(key, 11)).unwrap();
}

#[test]
fn top_up_may_exceed_escrowed_remainder() {
    let mut h = Harness::new(20_000_000);
    let key = h.funded(schedule(), 12);
    h.run(h.sender, &fund(key, 90)).unwrap();
    assert_eq!(h.escrow(&key), 10_200_000);
}

#[test]
fn fund_checks_caller_and_balance() {
    let mut h = Harness::new(500_000);
    let key = h.accepted(schedule());
    assert_eq!(
        codes(h.run(h.recipient, &fund(key, 10))),
        vec![PaymentError::Unauthorized, PaymentError::InsufficientFunds]
    );
    assert_eq!(
        codes(h.run(h.sender, &fund(key, 10))),
        vec![PaymentError::InsufficientFunds]
    );
    assert_eq!(h.ledger.balance_of(&h.sender), 500_000);
}

#[test]
fn operations_reject_foreign_accounts() {
    let mut h = Harness::new(2_000_000);
    let key = Pubkey::new_unique();
    h.ledger
        .set(LedgerAccount {
            address: address_from_public_key(&key),
            public_key: Some(key),
            balance: 0,
            payload: AccountPayload::Foreign(vec![1, 2, 3]),
        })
        .unwrap();

    let errors = h.run(h.sender, &fund(key, 10)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, PaymentError::NotAContract);
    assert_eq!(errors[0].field, "contract_public_key");

    assert_eq!(
        codes(h.run(h.recipient, &claim(Pubkey::new_unique(), 1))),
        vec![PaymentError::NotAContract]
    );
}

#[test]
fn claim_releases_matured_installments() {
    let mut h = Harness::new(2_000_000);
    let key = h.funded(schedule(), 12);

    h.now = T0 + SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 1)).unwrap();
    assert_eq!(h.contract(&key).installments_paid, 1);
    assert_eq!(h.escrow(&key), 1_100_000);
    assert_eq!(h.ledger.balance_of(&h.recipient), 100_000);

    // Three more slots pass; one claim takes all of them.
    h.now = T0 + 4 * SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 2)).unwrap();
    assert_eq!(h.contract(&key).installments_paid, 4);
    assert_eq!(h.escrow(&key), 800_000);
}

#[test]
fn claim_is_limited_by_escrow() {
    let mut h = Harness::new(2_000_000);
    let key = h.funded(schedule(), 10);
    h.now = T0 + 30 * SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 1)).unwrap();
    assert_eq!(h.contract(&key).installments_paid, 10);
    assert_eq!(h.escrow(&key), 0);
    assert_eq!(
        codes(h.run(h.recipient, &claim(key, 11))),
        vec![PaymentError::InsufficientFunds]
    );
}

#[test]
fn claim_reports_all_failed_checks() {
    let mut h = Harness::new(2_000_000);
    let key = h.funded(schedule(), 12);
    assert_eq!(
        codes(h.run(h.sender, &claim(key, 2))),
        vec![
            PaymentError::Unauthorized,
            PaymentError::SequenceMismatch,
            PaymentError::ScheduleViolation
        ]
    );
}

#[test]
fn last_claim_ends_the_contract() {
    let total = UnitSchedule {
        total_installments: 12,
        ..schedule()
    };
    let mut h = Harness::new(2_000_000);
    let key = h.funded(total, 12);

    h.now = T0 + 11 * SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 1)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.installments_paid, 11);
    assert_eq!(c.state, ContractState::Active);

    h.now = T0 + 20 * SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 12)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.installments_paid, 12);
    assert_eq!(c.state, ContractState::Ended);
    assert_eq!(h.escrow(&key), 0);
    assert_eq!(h.ledger.balance_of(&h.recipient), 1_200_000);
}

#[test]
fn terminate_splits_escrow_by_fee() {
    let fee = UnitSchedule {
        amount_per_installment: 10_000,
        termination_fee_installments: 1,
        ..schedule()
    };
    let mut h = Harness::new(1_000_000);
    let key = h.funded(fee, 10);
    assert_eq!(h.escrow(&key), 100_000);

    h.run(h.sender, &terminate(key, h.recipient, 1)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::TerminatedSender);
    assert_eq!(c.last_escrow_snapshot, 100_000);
    assert_eq!(h.escrow(&key), 0);
    assert_eq!(h.ledger.balance_of(&h.recipient), 10_000);
    assert_eq!(h.ledger.balance_of(&h.sender), 990_000);
}

#[test]
fn terminate_pays_matured_installments_first() {
    let mut h = Harness::new(2_000_000);
    let key = h.funded(schedule(), 12);
    h.now = T0 + 3 * SECONDS_PER_DAY;

    h.run(h.recipient, &terminate(key, h.sender, 1)).unwrap();
    let c = h.contract(&key);
    assert_eq!(c.state, ContractState::TerminatedRecipient);
    assert_eq!(c.installments_paid, 3);
    // Three matured plus one fee installment.
    assert_eq!(h.ledger.balance_of(&h.recipient), 400_000);
    assert_eq!(h.ledger.balance_of(&h.sender), 800_000 + 800_000);
}

#[test]
fn terminate_requires_the_right_peer_and_state() {
    let mut h = Harness::new(2_000_000);
    let key = h.accepted(schedule());
    assert_eq!(
        codes(h.run(h.sender, &terminate(key, h.recipient, 1))),
        vec![PaymentError::InvalidState]
    );
    h.run(h.sender, &fund(key, 10)).unwrap();
    assert_eq!(
        codes(h.run(h.sender, &terminate(key, Pubkey::new_unique(), 1))),
        vec![PaymentError::Unauthorized]
    );
    assert_eq!(
        codes(h.run(Pubkey::new_unique(), &terminate(key, h.sender, 1))),
        vec![PaymentError::Unauthorized, PaymentError::Unauthorized]
    );
}

#[test]
fn every_operation_undoes_exactly() {
    let mut h = Harness::new(2_000_000);
    let create = h.create_op(schedule());
    let key = create.contract_public_key();
    let keys = [h.sender, h.recipient, key];

    let raise = ScheduleOverride {
        amount_per_installment: Some(110_000),
        total_installments: Some(50),
        ..Default::default()
    };
    let was = ScheduleOverride {
        amount_per_installment: Some(100_000),
        total_installments: Some(100),
        ..Default::default()
    };
    let steps: Vec<(Pubkey, Operation, i64)> = vec![
        (h.sender, Operation::Create(create), T0),
        (h.recipient, counter(key, raise, was), T0 + 10),
        (h.sender, accept(key), T0 + 20),
        (h.sender, fund(key, 10), T0 + 30),
        (h.sender, fund(key, 2), T0 + 40),
        (h.recipient, claim(key, 1), T0 + 30 + 2 * SECONDS_PER_DAY),
        (
            h.sender,
            terminate(key, h.recipient, 3),
            T0 + 30 + 5 * SECONDS_PER_DAY,
        ),
    ];

    let mut history = Vec::new();
    for (caller, op, now) in &steps {
        h.now = *now;
        let before = h.snapshot(&keys);
        h.run(*caller, op).unwrap();
        assert_ne!(h.snapshot(&keys), before, "{} changed nothing", op.name());

        h.revert(*caller, op).unwrap();
        assert_eq!(h.snapshot(&keys), before, "{} did not undo", op.name());

        h.run(*caller, op).unwrap();
        history.push((before, *caller, op));
    }

    for (before, caller, op) in history.into_iter().rev() {
        h.revert(caller, op).unwrap();
        assert_eq!(h.snapshot(&keys), before);
    }
    assert_eq!(h.ledger.balance_of(&h.sender), 2_000_000);
}

#[test]
fn undo_rejects_a_mismatched_index() {
    let mut h = Harness::new(2_000_000);
    let key = h.funded(schedule(), 12);
    h.now = T0 + SECONDS_PER_DAY;
    h.run(h.recipient, &claim(key, 1)).unwrap();
    assert_eq!(
        codes(h.revert(h.recipient, &claim(key, 3))),
        vec![PaymentError::SequenceMismatch]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn claims_and_termination_conserve_funds(
        units in 10u16..=100,
        claim_days in 0i64..120,
        terminate_days in 0i64..120,
        by_sender in any::<bool>(),
    ) {
        let supply = 10_000_000u64;
        let mut h = Harness::new(supply);
        let key = h.funded(schedule(), units);
        let total = |h: &Harness| {
            h.ledger.balance_of(&h.sender)
                + h.ledger.balance_of(&h.recipient)
                + h.escrow(&key)
        };

        if claim_days >= 1 {
            h.now = T0 + claim_days * SECONDS_PER_DAY;
            h.run(h.recipient, &claim(key, 1)).unwrap();
            prop_assert_eq!(total(&h), supply);
        }

        let c = h.contract(&key);
        let index = c.installments_paid + 1;
        h.now = h.now.max(T0 + terminate_days * SECONDS_PER_DAY);
        let (caller, peer) = if by_sender {
            (h.sender, h.recipient)
        } else {
            (h.recipient, h.sender)
        };
        if c.state == ContractState::Active {
            let before = h.snapshot(&[h.sender, h.recipient, key]);
            let op = terminate(key, peer, index);
            h.run(caller, &op).unwrap();
            prop_assert_eq!(h.escrow(&key), 0);
            prop_assert_eq!(total(&h), supply);

            h.revert(caller, &op).unwrap();
            prop_assert_eq!(h.snapshot(&[h.sender, h.recipient, key]), before);
        }
    }
}
