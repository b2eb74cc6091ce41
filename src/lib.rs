pub mod container;
pub mod item;
pub mod policy;
pub mod price;
pub mod script;
pub mod session;

pub use container::{
    Container, ContainerId, DEFAULT_CAPACITY, SlotError, Subscription, TransferError,
    TransferFlags, TransferOp,
};
pub use item::{Item, ItemId};
pub use policy::{
    AffordabilityGate, Open, Receipt, Route, SellingContainer, SellingSink, ShopContainer,
    ShopPolicy, TransferPolicy,
};
pub use price::Price;
pub use session::{Command, ContainerName, Session, SessionConfig, SessionError, SlotRef};
