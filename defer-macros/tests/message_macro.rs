use defer_domain::message::{Message, SerializedMessage};
use defer_macros::message;

#[message(name = "orders.timeout")]
#[derive(PartialEq)]
struct OrderTimeoutMessage {
    order_id: u64,
}

#[message]
struct PaymentOverdue {
    invoice: String,
}

#[message(name = "orders.state")]
#[derive(PartialEq, Eq)]
enum OrderState {
    Pending,
    Cancelled { reason: String },
}

#[message]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ExistingDerives {
    order_id: u64,
}

#[test]
fn explicit_name_is_used() {
    assert_eq!(OrderTimeoutMessage::NAME, "orders.timeout");
    assert_eq!(OrderState::NAME, "orders.state");
}

#[test]
fn default_name_is_type_ident() {
    assert_eq!(PaymentOverdue::NAME, "PaymentOverdue");
    let p = PaymentOverdue {
        invoice: "inv-1".into(),
    };
    // Clone + Debug 由宏追加
    assert!(format!("{:?}", p.clone()).contains("inv-1"));
}

#[test]
fn generated_message_roundtrips_through_serialized_form() {
    let ser = SerializedMessage::from_message(&OrderState::Cancelled {
        reason: "timeout".into(),
    })
    .unwrap();
    assert_eq!(ser.message_type(), "orders.state");

    let back: OrderState = ser.into_message().unwrap();
    assert_eq!(
        back,
        OrderState::Cancelled {
            reason: "timeout".into()
        }
    );
    assert_ne!(back, OrderState::Pending);
}

#[test]
fn existing_derives_and_serde_attrs_are_kept() {
    let ser = SerializedMessage::from_message(&ExistingDerives { order_id: 9 }).unwrap();
    assert_eq!(ser.payload(), &serde_json::json!({"orderId": 9}));
    assert_eq!(
        ser.into_message::<ExistingDerives>().unwrap(),
        ExistingDerives { order_id: 9 }
    );
}

#[test]
fn compile_time_check_message_impl() {
    fn assert_message<M: Message>() {}
    assert_message::<OrderTimeoutMessage>();
    assert_message::<PaymentOverdue>();
    assert_message::<OrderState>();
}
