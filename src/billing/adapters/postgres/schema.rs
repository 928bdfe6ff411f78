//! Diesel schema for billing persistence.

diesel::table! {
    /// Billing preferences of user accounts.
    users (id) {
        /// Account identifier.
        id -> Uuid,
        /// Preferred invoice currency code.
        #[max_length = 3]
        currency -> Nullable<Varchar>,
        /// Fallback hourly rate.
        hourly_rate -> Nullable<Numeric>,
    }
}

diesel::table! {
    /// Client projects.
    projects (id) {
        /// Project identifier.
        id -> Uuid,
        /// Owning user.
        user_id -> Uuid,
        /// Client the project is delivered to.
        client_id -> Uuid,
        /// Display name.
        #[max_length = 255]
        name -> Varchar,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Pricing model.
        #[max_length = 10]
        billing_type -> Varchar,
        /// Project-level hourly rate.
        hourly_rate -> Nullable<Numeric>,
        /// Price of a fixed-price project.
        fixed_amount -> Nullable<Numeric>,
    }
}

diesel::table! {
    /// Project tasks with their accumulated hours.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task title.
        #[max_length = 255]
        title -> Varchar,
        /// Workflow status.
        #[max_length = 20]
        status -> Varchar,
        /// Hours accumulated from closed sessions.
        hours_worked -> Numeric,
        /// Task-level hourly rate.
        hourly_rate -> Nullable<Numeric>,
        /// Whether the task has been invoiced.
        is_billed -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Work sessions.
    time_entries (id) {
        /// Entry identifier.
        id -> Uuid,
        /// User who tracked the session.
        user_id -> Uuid,
        /// Task worked on.
        task_id -> Uuid,
        /// Optional session note.
        description -> Nullable<Text>,
        /// Session start.
        start_time -> Timestamptz,
        /// Session end, unset while running.
        end_time -> Nullable<Timestamptz>,
        /// Whole seconds, unset while running.
        duration -> Nullable<Int8>,
        /// Whether the session is open.
        is_running -> Bool,
    }
}

diesel::table! {
    /// Invoices with their stored totals.
    invoices (id) {
        /// Invoice identifier.
        id -> Uuid,
        /// Issuing user.
        user_id -> Uuid,
        /// Billed client.
        client_id -> Uuid,
        /// Billed project, unset for manual invoices.
        project_id -> Nullable<Uuid>,
        /// Human-readable number, unique per user.
        #[max_length = 50]
        number -> Varchar,
        /// Payment status.
        #[max_length = 10]
        status -> Varchar,
        /// Project or manual invoice.
        #[max_length = 10]
        kind -> Varchar,
        /// Currency code.
        #[max_length = 3]
        currency -> Varchar,
        /// Issue timestamp.
        issue_date -> Timestamptz,
        /// Due timestamp.
        due_date -> Timestamptz,
        /// Free-text notes.
        notes -> Nullable<Text>,
        /// Pre-tax total.
        total_ht -> Numeric,
        /// Tax total.
        total_tva -> Numeric,
        /// Tax-inclusive total.
        total_ttc -> Numeric,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Invoice line items.
    invoice_items (id) {
        /// Item identifier.
        id -> Uuid,
        /// Insertion order within the table.
        position -> Int8,
        /// Owning invoice.
        invoice_id -> Uuid,
        /// Billed task, if any.
        task_id -> Nullable<Uuid>,
        /// Line label.
        description -> Text,
        /// Quantity in hours or units.
        quantity -> Numeric,
        /// Price per unit.
        unit_price -> Numeric,
        /// Line total.
        total -> Numeric,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user, per-year invoice counters.
    invoice_sequences (user_id, year) {
        /// Counter owner.
        user_id -> Uuid,
        /// Calendar year.
        year -> Int4,
        /// Last issued sequence.
        last_value -> Int4,
    }
}

diesel::joinable!(tasks -> projects (project_id));
diesel::joinable!(time_entries -> tasks (task_id));
diesel::joinable!(invoice_items -> invoices (invoice_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    projects,
    tasks,
    time_entries,
    invoices,
    invoice_items,
    invoice_sequences,
);
