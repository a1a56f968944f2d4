pub mod customer_directory;
pub mod inventory_adapter;
pub mod invoice_repository;
pub mod payment_repository;
pub mod quotation_repository;
pub mod sequence_repository;
pub mod shop_directory;
pub mod statement_query;

pub use customer_directory::PostgresCustomerDirectory;
pub use inventory_adapter::PostgresInventoryAdapter;
pub use invoice_repository::PostgresInvoiceRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use quotation_repository::PostgresQuotationRepository;
pub use sequence_repository::PostgresSequenceCounterRepository;
pub use shop_directory::PostgresShopDirectory;
pub use statement_query::PostgresStatementSourceRepository;
