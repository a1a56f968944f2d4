pub mod entities;
pub mod errors;
pub mod ledger;
pub mod lifecycle;
pub mod numbering;
pub mod ports;
pub mod statement;
pub mod tax;
pub mod value_objects;

#[cfg(test)]
pub mod testing;

pub use entities::{
  Customer, Invoice, InvoiceItem, Payment, Quotation, QuotationItem, SequenceCounter, Shop,
};
pub use errors::BillingError;
pub use ledger::PaymentLedger;
pub use lifecycle::{INVOICE_REFERENCE_TYPE, InvoiceLifecycle};
pub use numbering::{NumberingFormat, ParsedDocumentNumber, SequenceAllocator};
pub use ports::{
  CustomerDirectory, InventoryPort, InvoiceRepository, PaymentRepository, QuotationRepository,
  SequenceCounterRepository, ShopDirectory, StatementSnapshot, StatementSourceRepository,
  StockMovement,
};
pub use statement::{Statement, StatementBuilder, StatementEntry, StatementEntryKind};
pub use tax::{TaxDefaults, TaxableLine, Totals};
pub use value_objects::{
  CustomerCode, DocumentNumber, InvoiceStatus, ItemDescription, PaymentMethod, Quantity,
  ShopCode, TaxRate, UnitRate, ValueObjectError, money_tolerance, round_money,
};
