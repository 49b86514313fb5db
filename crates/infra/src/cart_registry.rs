//! Per-buyer cart sessions.
//!
//! A session owns one `Cart` plus a checkout flag, both behind one mutex.
//! While a checkout holds the flag, a second checkout is refused and cart
//! edits fail with `Conflict`. The flag is raised and the cart copied under
//! the same guard, so no edit can slip in between.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use nexus_cart::Cart;
use nexus_catalog::{Product, ProductId};
use nexus_core::{DomainError, DomainResult, UserId};

#[derive(Debug)]
struct SessionState {
    cart: Cart,
    checking_out: bool,
}

impl SessionState {
    fn editable_cart(&mut self) -> DomainResult<&mut Cart> {
        if self.checking_out {
            return Err(DomainError::conflict("cart is locked for checkout"));
        }
        Ok(&mut self.cart)
    }
}

#[derive(Debug)]
pub struct CartSession {
    state: Mutex<SessionState>,
}

impl CartSession {
    pub fn new(buyer_id: UserId) -> Self {
        Self {
            state: Mutex::new(SessionState {
                cart: Cart::new(buyer_id),
                checking_out: false,
            }),
        }
    }

    pub fn buyer_id(&self) -> UserId {
        self.state().cart.buyer_id()
    }

    /// Copy of the cart as it is right now.
    pub fn snapshot(&self) -> Cart {
        self.state().cart.clone()
    }

    pub fn total(&self) -> u64 {
        self.state().cart.total()
    }

    pub fn item_count(&self) -> u32 {
        self.state().cart.item_count()
    }

    pub fn is_checking_out(&self) -> bool {
        self.state().checking_out
    }

    pub fn add_item(&self, product: &Product, quantity: u32) -> DomainResult<u32> {
        self.state().editable_cart()?.add_item(product, quantity)
    }

    pub fn remove_item(&self, product_id: &ProductId) -> DomainResult<u32> {
        self.state().editable_cart()?.remove_item(product_id)
    }

    pub fn clear(&self) -> DomainResult<()> {
        self.state().editable_cart()?.clear();
        Ok(())
    }

    /// Claim the checkout flag and freeze the cart contents being bought.
    /// `None` when another checkout already holds it.
    pub(crate) fn try_begin_checkout(&self) -> Option<CheckoutLock<'_>> {
        let mut state = self.state();
        if state.checking_out {
            return None;
        }
        state.checking_out = true;
        Some(CheckoutLock {
            session: self,
            cart: state.cart.clone(),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // Cart operations validate before mutating, so a poisoned state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the duration of a checkout; releases the flag on drop, whichever
/// way the checkout ends.
#[derive(Debug)]
pub(crate) struct CheckoutLock<'a> {
    session: &'a CartSession,
    cart: Cart,
}

impl CheckoutLock<'_> {
    /// The cart as it was when the checkout began. Edits are refused until
    /// the lock drops, so it is also the cart as it is now.
    pub(crate) fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Empty the cart after a committed order. Bypasses the edit lock this
    /// guard itself holds.
    pub(crate) fn clear_cart(&self) {
        self.session.state().cart.clear();
    }
}

impl Drop for CheckoutLock<'_> {
    fn drop(&mut self) {
        self.session.state().checking_out = false;
    }
}

/// Sessions keyed by buyer.
#[derive(Debug, Default)]
pub struct CartRegistry {
    sessions: RwLock<HashMap<UserId, Arc<CartSession>>>,
}

impl CartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buyer's session, created on first use.
    pub fn session(&self, buyer_id: UserId) -> Arc<CartSession> {
        if let Some(existing) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&buyer_id)
        {
            return Arc::clone(existing);
        }
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(buyer_id)
                .or_insert_with(|| Arc::new(CartSession::new(buyer_id))),
        )
    }

    /// Drop a buyer's session (logout).
    pub fn end_session(&self, buyer_id: UserId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&buyer_id)
            .is_some()
    }
}
