use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use till_core::{Aggregate, AggregateRoot, CartId, DomainError, DomainResult, ProductId};
use till_events::Event;
use till_products::Product;

/// One aggregated position in the sale: a product plus how many of it.
///
/// At most one line exists per product id, and `quantity` is never zero
/// (a line that would reach zero is removed instead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            category: product.category.clone(),
            quantity,
        }
    }

    /// `price * quantity`.
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// The catalog product this line was built from.
    pub fn product(&self) -> Product {
        Product {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
        }
    }
}

impl From<&Product> for CartLine {
    fn from(product: &Product) -> Self {
        Self::new(product, 1)
    }
}

/// Sale payload handed to the backend when the sale is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.id,
            name: line.name.clone(),
            price: line.price,
            quantity: line.quantity,
        }
    }
}

/// Aggregate root: Cart.
///
/// Lines keep the order in which each product was first added. While
/// `locked` (checkout in progress) adding and removing items is refused with
/// `DomainError::InvariantViolation`; clearing stays allowed so a completed
/// sale can be emptied before the cart is unlocked.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    id: CartId,
    lines: Vec<CartLine>,
    locked: bool,
    version: u64,
}

impl Cart {
    /// A fresh, empty, unlocked cart with a new id.
    pub fn new() -> Self {
        Self::empty(CartId::new())
    }

    /// An empty, unlocked cart with the given id.
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            lines: Vec::new(),
            locked: false,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == product_id)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `price * quantity` over every line.
    pub fn sub_total(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Amount due. There is no discount or tax layer, so this equals `sub_total()`.
    pub fn total(&self) -> f64 {
        self.sub_total()
    }

    /// Snapshot of the lines in the shape the backend records a sale with.
    pub fn checkout_lines(&self) -> Vec<CheckoutLine> {
        self.lines.iter().map(CheckoutLine::from).collect()
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> DomainResult<Vec<CartEvent>> {
        self.execute(&CartCommand::AddItem(AddItem {
            product: product.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    /// Remove a product entirely (`None`) or by `quantity` units.
    pub fn remove_item(
        &mut self,
        product_id: ProductId,
        quantity: Option<u32>,
    ) -> DomainResult<Vec<CartEvent>> {
        self.execute(&CartCommand::RemoveItem(RemoveItem {
            product_id,
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    pub fn clear(&mut self) -> DomainResult<Vec<CartEvent>> {
        self.execute(&CartCommand::Clear(ClearCart {
            occurred_at: Utc::now(),
        }))
    }

    pub fn lock(&mut self) -> DomainResult<Vec<CartEvent>> {
        self.execute(&CartCommand::Lock(LockCart {
            occurred_at: Utc::now(),
        }))
    }

    pub fn unlock(&mut self) -> DomainResult<Vec<CartEvent>> {
        self.execute(&CartCommand::Unlock(UnlockCart {
            occurred_at: Utc::now(),
        }))
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddItem {
    pub product: Product,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub product_id: ProductId,
    /// `None` removes the whole line.
    pub quantity: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCart {
    pub occurred_at: DateTime<Utc>,
}

/// Command: LockCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockCart {
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnlockCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockCart {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    RemoveItem(RemoveItem),
    Clear(ClearCart),
    Lock(LockCart),
    Unlock(UnlockCart),
}

/// Event: LineAdded (first time a product enters the cart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdded {
    pub cart_id: CartId,
    pub line: CartLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityIncreased. `quantity` is the line's new quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityIncreased {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub delta: u32,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityDecreased. `quantity` is the line's new quantity (always > 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityDecreased {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub delta: u32,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCleared {
    pub cart_id: CartId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartLocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLocked {
    pub cart_id: CartId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartUnlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUnlocked {
    pub cart_id: CartId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CartEvent {
    LineAdded(LineAdded),
    QuantityIncreased(QuantityIncreased),
    QuantityDecreased(QuantityDecreased),
    LineRemoved(LineRemoved),
    CartCleared(CartCleared),
    CartLocked(CartLocked),
    CartUnlocked(CartUnlocked),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::LineAdded(_) => "sales.cart.line_added",
            CartEvent::QuantityIncreased(_) => "sales.cart.quantity_increased",
            CartEvent::QuantityDecreased(_) => "sales.cart.quantity_decreased",
            CartEvent::LineRemoved(_) => "sales.cart.line_removed",
            CartEvent::CartCleared(_) => "sales.cart.cleared",
            CartEvent::CartLocked(_) => "sales.cart.locked",
            CartEvent::CartUnlocked(_) => "sales.cart.unlocked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::LineAdded(e) => e.occurred_at,
            CartEvent::QuantityIncreased(e) => e.occurred_at,
            CartEvent::QuantityDecreased(e) => e.occurred_at,
            CartEvent::LineRemoved(e) => e.occurred_at,
            CartEvent::CartCleared(e) => e.occurred_at,
            CartEvent::CartLocked(e) => e.occurred_at,
            CartEvent::CartUnlocked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            CartEvent::QuantityIncreased(QuantityIncreased {
                product_id,
                quantity,
                ..
            })
            | CartEvent::QuantityDecreased(QuantityDecreased {
                product_id,
                quantity,
                ..
            }) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.id == *product_id) {
                    line.quantity = *quantity;
                }
            }
            CartEvent::LineRemoved(e) => {
                self.lines.retain(|line| line.id != e.product_id);
            }
            CartEvent::CartCleared(_) => {
                self.lines.clear();
            }
            CartEvent::CartLocked(_) => {
                self.locked = true;
            }
            CartEvent::CartUnlocked(_) => {
                self.locked = false;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem(cmd) => self.handle_add_item(cmd),
            CartCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
            CartCommand::Clear(cmd) => self.handle_clear(cmd),
            CartCommand::Lock(cmd) => self.handle_lock(cmd),
            CartCommand::Unlock(cmd) => self.handle_unlock(cmd),
        }
    }
}

impl Cart {
    fn ensure_unlocked(&self) -> Result<(), DomainError> {
        if self.locked {
            return Err(DomainError::invariant("cart is locked"));
        }
        Ok(())
    }

    fn handle_add_item(&self, cmd: &AddItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_unlocked()?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        cmd.product.validate()?;

        if let Some(existing) = self.line(cmd.product.id) {
            let quantity = existing
                .quantity
                .checked_add(cmd.quantity)
                .ok_or_else(|| DomainError::validation("line quantity overflow"))?;

            return Ok(vec![CartEvent::QuantityIncreased(QuantityIncreased {
                cart_id: self.id,
                product_id: existing.id,
                delta: cmd.quantity,
                quantity,
                occurred_at: cmd.occurred_at,
            })]);
        }

        Ok(vec![CartEvent::LineAdded(LineAdded {
            cart_id: self.id,
            line: CartLine::new(&cmd.product, cmd.quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_unlocked()?;

        if cmd.quantity == Some(0) {
            return Err(DomainError::validation("quantity to remove must be positive"));
        }

        let Some(existing) = self.line(cmd.product_id) else {
            return Ok(Vec::new());
        };

        let event = match cmd.quantity {
            Some(delta) if existing.quantity > delta => {
                CartEvent::QuantityDecreased(QuantityDecreased {
                    cart_id: self.id,
                    product_id: existing.id,
                    delta,
                    quantity: existing.quantity - delta,
                    occurred_at: cmd.occurred_at,
                })
            }
            _ => CartEvent::LineRemoved(LineRemoved {
                cart_id: self.id,
                product_id: existing.id,
                occurred_at: cmd.occurred_at,
            }),
        };

        Ok(vec![event])
    }

    fn handle_clear(&self, cmd: &ClearCart) -> Result<Vec<CartEvent>, DomainError> {
        if self.lines.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![CartEvent::CartCleared(CartCleared {
            cart_id: self.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_lock(&self, cmd: &LockCart) -> Result<Vec<CartEvent>, DomainError> {
        if self.locked {
            return Ok(Vec::new());
        }

        Ok(vec![CartEvent::CartLocked(CartLocked {
            cart_id: self.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unlock(&self, cmd: &UnlockCart) -> Result<Vec<CartEvent>, DomainError> {
        if !self.locked {
            return Ok(Vec::new());
        }

        Ok(vec![CartEvent::CartUnlocked(CartUnlocked {
            cart_id: self.id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
