//! Carousel prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, CartItem, CartStore, InMemoryCartStore, ProductRef, SessionCart},
    catalog::{
        CatalogFilter, CatalogPage, ContinuationToken, SortKey,
        facade::{Catalog, CatalogStore, InMemoryCatalogStore},
    },
    checkout::{
        CheckoutError, CheckoutFlow, CheckoutOutcome, GatewayError, PaymentGateway,
        PaymentInterruption, PaymentOutcome,
    },
    orders::{
        InvalidAddress, Order, OrderDraft, OrderId, OrderItem, OrderStatus, PaymentId,
        PaymentMethod, PaymentStatus, ShippingAddress,
        repository::{InMemoryOrderStore, OrderRepository},
        service::{OrderError, Orders},
    },
    persistence::PersistenceError,
    prices::{Amount, AmountError},
    pricing::{PricingError, PricingPolicy, PricingQuote},
    products::{Product, ProductId},
    users::{
        CurrentUser, IdentityProvider, InMemoryProfileStore, ProfileError, ProfileStore, Profiles,
        UserId, UserProfile,
    },
    wishlist::{
        InMemoryWishlistStore, ProductSnapshot, Wishlist, WishlistEntry, WishlistError,
        WishlistStore,
    },
};
